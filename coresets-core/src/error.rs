use std::fmt;

/// Result alias for the numeric kernels.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors raised by the kernels before any output is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A caller-supplied value violates a precondition (empty input,
    /// mismatched lengths, malformed offsets, out-of-range index).
    InvalidArgument(String),
    /// The data is well formed but cannot yield a valid distribution.
    InvalidState(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            CoreError::InvalidState(msg) => write!(f, "invalid state: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}
