//! Error kinds surfaced by the dashboard client.

/// Failure of a client operation.
///
/// Every variant carries owned text so results can be cloned out of a
/// finished promise and rendered as a notification.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Rejected locally before any network I/O.
    #[error("{0}")]
    Validation(String),
    /// Connection-level failure: refused, reset, DNS, timeout.
    #[error("Network error: {0}")]
    Network(String),
    /// `/upload` answered with a non-success status.
    #[error("Upload failed: {0}")]
    UploadFailed(String),
    /// `/predict` answered with a non-success status.
    #[error("{0}")]
    PredictionFailed(String),
    /// Success status, but the body was not the expected JSON.
    #[error("Invalid response format: {0}")]
    MalformedResponse(String),
    /// `/results` or `/results/{id}` answered with a non-success status.
    #[error("Failed to fetch results: {0}")]
    FetchFailed(String),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True when the error never reached the network.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
