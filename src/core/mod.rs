// Public modules
pub mod credentials;
pub mod dns;
pub mod error;
pub mod identity;
pub mod operator;
pub mod pipeline;
pub mod remote;

// Internal modules - not part of public API
pub(crate) mod paths;

// Public modules for CLI access
pub mod defaults;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, ErrorKind, Result};
