//! Terminal I/O utilities for CLI.
//!
//! Provides TTY detection, user prompting and the console operator.

use std::io::{self, BufRead, IsTerminal, Write};

use hostadmin::operator::Operator;

pub fn is_stdin_tty() -> bool {
    io::stdin().is_terminal()
}

/// Prompt on stderr and read one line from stdin.
///
/// Only the line terminator is removed, so `" y"` stays `" y"`.
pub fn prompt(message: &str) -> hostadmin::Result<String> {
    eprint!("{}", message);
    io::stderr().flush().ok();

    let stdin = io::stdin();
    let mut line = String::new();
    stdin.lock().read_line(&mut line).map_err(|e| {
        hostadmin::Error::internal_io(e.to_string(), Some("read stdin".to_string()))
    })?;

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Reads like [`prompt`]; input is echoed.
pub fn prompt_password(message: &str) -> hostadmin::Result<String> {
    prompt(message)
}

/// Print status message to stderr if running in a terminal.
pub fn status(message: &str) {
    if io::stderr().is_terminal() {
        eprintln!("{}", message);
    }
}

/// Operator backed by the process console: messages on stderr, answers from stdin.
pub struct ConsoleOperator;

impl Operator for ConsoleOperator {
    fn ask(&mut self, message: &str) -> hostadmin::Result<String> {
        prompt(message)
    }

    fn show(&mut self, message: &str) {
        eprintln!("{}", message);
    }
}

// log_status! macro is defined in lib.rs (#[macro_export]) and available crate-wide.
