//! Session layer errors

use thiserror::Error;

/// Errors that end or interrupt an interactive session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input stream reached EOF while waiting at a prompt
    #[error("Input closed")]
    InputClosed,

    #[error("Invalid menu choice: {0:?}")]
    InvalidChoice(String),
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    pub fn invalid_choice(input: &str) -> Self {
        Self::InvalidChoice(input.to_string())
    }

    pub fn is_input_closed(&self) -> bool {
        matches!(self, Self::InputClosed)
    }
}
