//! Generic utility primitives with zero domain knowledge.
//!
//! - `shell` - Shell quoting, PowerShell command encoding and shell invocation
//! - `validation` - Input validation helpers

pub mod shell;
pub mod validation;
