//! The human at the console.
//!
//! Workflows talk to the operator through this trait so the confirmation gate
//! and stage walkthroughs can be driven by a terminal or by a script.

use crate::error::Result;

pub trait Operator {
    /// Show a message and read one line of input, line terminator stripped.
    fn ask(&mut self, message: &str) -> Result<String>;

    /// Show a message without waiting for input.
    fn show(&mut self, message: &str);
}

/// Only an exact `Y` or `y` is affirmative. Surrounding whitespace, `yes`
/// and empty input all count as refusal.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim_end_matches(['\r', '\n']), "Y" | "y")
}
