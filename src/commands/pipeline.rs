use clap::{Args, Subcommand};
use serde::Serialize;

use hostadmin::pipeline::{self, PipelineRun, RunMode, ShellEvaluator};

use super::{CmdResult, GlobalArgs};
use crate::tty::ConsoleOperator;

#[derive(Args)]
pub struct PipelineArgs {
    #[command(subcommand)]
    command: PipelineCommand,
}

#[derive(Subcommand)]
enum PipelineCommand {
    /// Evaluate a piped command one stage at a time
    ///
    /// Example:
    ///   hostadmin pipeline run "cat /etc/hosts | grep -v '^#' | sort"
    Run {
        /// Command with stages separated by '|' (quote it)
        command: String,

        /// Show each stage's result and wait for Enter before the next one
        #[arg(long)]
        interactive: bool,
    },
    /// Show the stages of a piped command without evaluating them
    Split {
        /// Command with stages separated by '|' (quote it)
        command: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSplitOutput {
    pub stage_count: usize,
    pub stages: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PipelineOutput {
    Run(PipelineRun),
    Split(PipelineSplitOutput),
}

pub fn run(args: PipelineArgs, global: &GlobalArgs) -> CmdResult<PipelineOutput> {
    match args.command {
        PipelineCommand::Run {
            command,
            interactive,
        } => {
            let config = global.load_config()?;
            let evaluator = ShellEvaluator {
                shell: config.defaults.pipeline.shell,
            };
            let mode = if interactive {
                RunMode::Interactive
            } else {
                RunMode::Batch
            };

            let report = pipeline::run(&command, &evaluator, mode, &mut ConsoleOperator)?;
            Ok((PipelineOutput::Run(report), 0))
        }
        PipelineCommand::Split { command } => {
            let stages = pipeline::split_stages(&command)?;
            Ok((
                PipelineOutput::Split(PipelineSplitOutput {
                    stage_count: stages.len(),
                    stages,
                }),
                0,
            ))
        }
    }
}
