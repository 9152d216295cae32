use thiserror::Error;

/// Errors raised while interpreting server-provided progression data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModelError {
    #[error("invalid test number: {0}")]
    InvalidTestNumber(u8),
}

/// Local precondition failures. These never reach the remote service.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum LocalStateError {
    #[error("no answer selected")]
    NoSelection,
    #[error("no current question")]
    NoCurrentQuestion,
    #[error("question content is not loaded")]
    NotReady,
    #[error("action is not available in the current step")]
    ActionUnavailable,
    #[error("assessment must be reset on the server")]
    ResetRequired,
    #[error("no active identity")]
    NoIdentity,
}
