//! Shared error types for the services crate.

use thiserror::Error;

use treatment_core::LocalStateError;

/// Errors emitted by `ProgressApi` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("progress api is not configured")]
    Disabled,
    #[error("progress api request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("request rejected by server: {}", reason.as_deref().unwrap_or("unknown"))]
    Rejected { reason: Option<String> },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// Transport failure reported by a non-HTTP implementation.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Errors surfaced by the flow controllers.
///
/// `InvalidLocalState` is raised before any network call; the other two are
/// recoverable by re-invoking the action or reloading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FlowError {
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("rejected by server: {}", reason.as_deref().unwrap_or("unknown"))]
    RejectedByServer { reason: Option<String> },
    #[error(transparent)]
    InvalidLocalState(#[from] LocalStateError),
}

impl FlowError {
    /// Whether the consumer should offer a retry affordance.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FlowError::InvalidLocalState(_))
    }
}

impl From<ApiError> for FlowError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Rejected { reason } => FlowError::RejectedByServer { reason },
            other => FlowError::NetworkFailure(other.to_string()),
        }
    }
}
