//! Common result and error types for the Sigil linker.

/// The standard result type for fallible internal operations.
///
/// `Err` indicates an unrecoverable internal error (a bug in the linker),
/// not a data problem in an archive. Archive and resolution problems have
/// their own error types in the crates that detect them.
pub type SigilResult<T> = Result<T, InternalError>;

/// An internal linker error indicating a bug, not a user input problem.
#[derive(Debug, thiserror::Error)]
#[error("internal linker error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
