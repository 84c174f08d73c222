use shared::domain::SlaughterNumber;
use thiserror::Error;

/// Failure returned from the backend boundary. Both variants leave the
/// session where it was and are retryable by the operator.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network unreachable, timeout, or a non-success status.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Response body did not match the expected shape.
    #[error("protocol failure: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Protocol(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("wizard already running for unit {0}")]
    AlreadyStarted(SlaughterNumber),
    #[error("no action is awaiting input")]
    NoCurrentAction,
    #[error("no photo staged for the current photo action")]
    NoPhotoStaged,
    #[error(transparent)]
    Source(#[from] SourceError),
}
