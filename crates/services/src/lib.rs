#![forbid(unsafe_code)]

pub mod api;
pub mod assessment_flow;
pub mod baseline_flow;
pub mod error;
mod guard;
pub mod progress_screen;

pub use api::{ApiConfig, BaselineAnswer, BaselinePayload, HttpProgressApi, ProgressApi};
pub use assessment_flow::AssessmentFlow;
pub use baseline_flow::BaselineFlow;
pub use error::{ApiError, FlowError};
pub use progress_screen::ProgressScreen;

/// How an invoked action was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Remote calls succeeded and local state was updated.
    Applied,
    /// Another action was outstanding (or the work was already done); nothing ran.
    Dropped,
    /// The calls completed after an identity change or teardown; results were discarded.
    Stale,
}
