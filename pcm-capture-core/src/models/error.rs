use thiserror::Error;

/// Errors that can occur while capturing or finalizing a recording.
///
/// Carries string context instead of source errors so a value can be cloned
/// into session state and handed to delegates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("audio source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("i/o failure: {0}")]
    IoFailure(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl CaptureError {
    /// Wrap an `io::Error` with the operation that produced it.
    pub fn io(context: &str, err: std::io::Error) -> Self {
        Self::IoFailure(format!("{}: {}", context, err))
    }
}
