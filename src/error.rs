use std::fmt;

use coresets_core::CoreError;

use crate::storage::StorageError;

/// Result alias for `coresets`.
pub type CoresetResult<T> = std::result::Result<T, CoresetError>;

/// Errors returned by coreset construction. All of them abort the call and
/// leave the caller's dataset as it was.
#[derive(Debug)]
pub enum CoresetError {
    /// Non-positive `nprime`, zero threads, zero rows or columns, mismatched
    /// column counts across chunks, malformed offsets.
    InvalidArgument(String),
    /// Input is well formed but degenerate, e.g. every row equals the mean.
    InvalidState(String),
    /// A chunk file is missing, corrupt or unreadable.
    Io(StorageError),
    /// A request the configured policies refuse, e.g. oversampling when
    /// `OversamplingPolicy::Reject` is set.
    Unsupported(String),
    /// The worker pool could not be created.
    ThreadPool(String),
}

impl fmt::Display for CoresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoresetError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            CoresetError::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            CoresetError::Io(e) => write!(f, "chunk I/O failure: {e}"),
            CoresetError::Unsupported(msg) => write!(f, "unsupported: {msg}"),
            CoresetError::ThreadPool(msg) => write!(f, "thread pool error: {msg}"),
        }
    }
}

impl std::error::Error for CoresetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CoresetError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CoreError> for CoresetError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidArgument(msg) => CoresetError::InvalidArgument(msg),
            CoreError::InvalidState(msg) => CoresetError::InvalidState(msg),
        }
    }
}

impl From<StorageError> for CoresetError {
    fn from(e: StorageError) -> Self {
        CoresetError::Io(e)
    }
}

impl From<rayon::ThreadPoolBuildError> for CoresetError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        CoresetError::ThreadPool(e.to_string())
    }
}
