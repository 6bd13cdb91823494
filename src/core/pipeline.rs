use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::Stdio;

use crate::error::{Error, Result};
use crate::operator::Operator;
use crate::utils::shell;

pub const STAGE_DELIMITER: char = '|';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStage {
    pub index: usize,
    pub source_text: String,
    pub result: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Show each stage as it completes and wait for the operator in between.
    Interactive,
    /// Collect every stage and return them together.
    Batch,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub mode: RunMode,
    pub stage_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<PipelineStage>,
    pub final_result: String,
}

/// Evaluates one stage's text. `input` is the previous stage's result, absent
/// for the first stage.
pub trait StageEvaluator {
    fn evaluate(&self, stage: usize, text: &str, input: Option<&str>) -> Result<String>;
}

/// Split a piped command into trimmed stages.
///
/// Fewer than two stages, or an empty stage, is a validation error.
pub fn split_stages(command: &str) -> Result<Vec<String>> {
    let stages: Vec<String> = command
        .split(STAGE_DELIMITER)
        .map(|stage| stage.trim().to_string())
        .collect();

    if stages.len() < 2 {
        return Err(Error::validation_invalid_argument(
            "command",
            format!(
                "Expected at least two stages separated by '{}'",
                STAGE_DELIMITER
            ),
            Some(command.to_string()),
        ));
    }

    if let Some(position) = stages.iter().position(|stage| stage.is_empty()) {
        return Err(Error::validation_invalid_argument(
            "command",
            format!("Stage {} is empty", position + 1),
            Some(command.to_string()),
        ));
    }

    Ok(stages)
}

/// Evaluate every stage in order, threading each result into the next stage.
pub fn run(
    command: &str,
    evaluator: &dyn StageEvaluator,
    mode: RunMode,
    operator: &mut dyn Operator,
) -> Result<PipelineRun> {
    let texts = split_stages(command)?;
    let total = texts.len();
    let mut stages: Vec<PipelineStage> = Vec::with_capacity(total);
    let mut previous: Option<String> = None;

    for (offset, text) in texts.into_iter().enumerate() {
        let index = offset + 1;
        let result = evaluator.evaluate(index, &text, previous.as_deref())?;

        if mode == RunMode::Interactive {
            operator.show(&format!("Stage {}/{}: {}", index, total, text));
            operator.show(result.trim_end());
            if index < total {
                operator.ask(&format!(
                    "Press Enter to continue to stage {}... ",
                    index + 1
                ))?;
            }
        }

        previous = Some(result.clone());
        stages.push(PipelineStage {
            index,
            source_text: text,
            result,
        });
    }

    let final_result = previous.unwrap_or_default();

    Ok(PipelineRun {
        mode,
        stage_count: total,
        stages: match mode {
            RunMode::Batch => stages,
            RunMode::Interactive => Vec::new(),
        },
        final_result,
    })
}

/// Runs each stage through a shell with the previous result on stdin.
pub struct ShellEvaluator {
    pub shell: Option<String>,
}

impl StageEvaluator for ShellEvaluator {
    fn evaluate(&self, stage: usize, text: &str, input: Option<&str>) -> Result<String> {
        let mut cmd = shell::shell_command(self.shell.as_deref(), text);
        cmd.stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::pipeline_stage_failed(stage, text, None, e.to_string()))?;

        let output = std::thread::scope(|scope| {
            if let (Some(mut stdin), Some(data)) = (child.stdin.take(), input) {
                // A stage that never reads its input closes the pipe early.
                scope.spawn(move || {
                    let _ = stdin.write_all(data.as_bytes());
                });
            }
            child.wait_with_output()
        })
        .map_err(|e| Error::pipeline_stage_failed(stage, text, None, e.to_string()))?;

        if !output.status.success() {
            return Err(Error::pipeline_stage_failed(
                stage,
                text,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn split_trims_each_stage() {
        let stages = split_stages("A | B | C").unwrap();
        assert_eq!(stages, vec!["A", "B", "C"]);
    }

    #[test]
    fn split_requires_a_delimiter() {
        let err = split_stages("Get-Process").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationInvalidArgument);
    }

    #[test]
    fn split_rejects_empty_stages() {
        assert!(split_stages("A || B").is_err());
        assert!(split_stages("A | ").is_err());
        assert!(split_stages("|").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn shell_evaluator_threads_stdin() {
        let evaluator = ShellEvaluator { shell: None };
        let first = evaluator.evaluate(1, "printf 'b\\na\\n'", None).unwrap();
        let second = evaluator.evaluate(2, "sort", Some(&first)).unwrap();
        assert_eq!(second, "a\nb\n");
    }

    #[cfg(unix)]
    #[test]
    fn shell_evaluator_reports_failing_stage() {
        let evaluator = ShellEvaluator { shell: None };
        let err = evaluator
            .evaluate(2, "echo boom >&2; exit 3", Some("ignored"))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PipelineStageFailed);
        assert_eq!(err.details["stage"], 2);
        assert_eq!(err.details["exitCode"], 3);
        assert_eq!(err.cause.map(|c| c.message), Some("boom".to_string()));
    }
}
