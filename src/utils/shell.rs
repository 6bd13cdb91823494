//! Shell escaping, quoting and invocation utilities.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::process::Command;

/// Escape a value for use inside PowerShell single quotes.
///
/// PowerShell accepts `'` and the typographic quotes U+2018 to U+201B as
/// single quotes; each is escaped by doubling it.
pub fn escape_single_quote_content(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if is_single_quote(c) {
            escaped.push(c);
        }
        escaped.push(c);
    }
    escaped
}

fn is_single_quote(c: char) -> bool {
    matches!(c, '\'' | '\u{2018}'..='\u{201B}')
}

/// Quote a value as a PowerShell verbatim string literal (always quotes).
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", escape_single_quote_content(value))
}

/// Render values as a PowerShell string array literal, e.g. `@('a','b')`.
pub fn quote_array<S: AsRef<str>>(values: &[S]) -> String {
    let items: Vec<String> = values.iter().map(|v| quote_literal(v.as_ref())).collect();
    format!("@({})", items.join(","))
}

/// Encode a script for `powershell -EncodedCommand`: base64 of its UTF-16LE bytes.
pub fn encode_powershell_command(script: &str) -> String {
    let bytes: Vec<u8> = script.encode_utf16().flat_map(u16::to_le_bytes).collect();
    STANDARD.encode(bytes)
}

/// Build a command that runs `command` through the given shell, or the
/// platform shell when none is configured (`cmd /C` on Windows, `sh -c` elsewhere).
pub fn shell_command(shell: Option<&str>, command: &str) -> Command {
    match shell {
        Some(program) => {
            let flag = if is_cmd_exe(program) { "/C" } else { "-c" };
            let mut cmd = Command::new(program);
            cmd.args([flag, command]);
            cmd
        }
        None => {
            #[cfg(windows)]
            let cmd = {
                let mut cmd = Command::new("cmd");
                cmd.args(["/C", command]);
                cmd
            };

            #[cfg(not(windows))]
            let cmd = {
                let mut cmd = Command::new("sh");
                cmd.args(["-c", command]);
                cmd
            };

            cmd
        }
    }
}

fn is_cmd_exe(program: &str) -> bool {
    let name = program
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(program)
        .to_ascii_lowercase();
    name == "cmd" || name == "cmd.exe"
}
