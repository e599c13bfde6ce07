/// Core error types for the codebox system
use thiserror::Error;

/// Unexpected faults raised by the execution core.
///
/// Classified outcomes (compile errors, timeouts, missing toolchains, ...)
/// are never reported through this type; they are returned as
/// [`crate::verdict::ExecutionResult`] data. Only infrastructure faults
/// such as an unwritable workspace root travel through `CodeboxError`.
#[derive(Error, Debug)]
pub enum CodeboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Process error: {0}")]
    Process(String),
}

impl From<nix::errno::Errno> for CodeboxError {
    fn from(err: nix::errno::Errno) -> Self {
        CodeboxError::Process(err.to_string())
    }
}

impl From<serde_json::Error> for CodeboxError {
    fn from(err: serde_json::Error) -> Self {
        CodeboxError::Config(err.to_string())
    }
}

/// Result type alias for codebox operations
pub type Result<T> = std::result::Result<T, CodeboxError>;
