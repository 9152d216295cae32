mod http;

use async_trait::async_trait;
use serde::Serialize;

use treatment_core::model::{
    AssessmentResult, AssessmentSession, BaselineSession, Identity, ProgressSnapshot, QuestionSet,
    ReviewResultEnvelope, TestNo,
};

use crate::error::ApiError;

pub use http::{ApiConfig, HttpProgressApi};

/// Answer posted for a baseline step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaselineAnswer {
    pub step_type: &'static str,
    pub step_id: String,
    pub payload: BaselinePayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BaselinePayload {
    Acknowledged { acknowledged: bool },
    Choice { option_index: usize },
}

/// Remote service contract.
///
/// Every mutation reports failure (transport or a false success flag) as an
/// `ApiError`; callers must not touch local state unless it returns `Ok`.
#[async_trait]
pub trait ProgressApi: Send + Sync {
    /// Fetch the full progression snapshot. Must bypass any cache.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport or decoding failures.
    async fn fetch_state(&self, identity: &Identity) -> Result<ProgressSnapshot, ApiError>;

    /// Fetch the baseline step triple, `None` when no session exists.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport or decoding failures.
    async fn baseline_state(&self, identity: &Identity)
    -> Result<Option<BaselineSession>, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the service does not confirm success.
    async fn baseline_start(&self, identity: &Identity) -> Result<(), ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the service does not confirm success.
    async fn baseline_answer(
        &self,
        identity: &Identity,
        answer: &BaselineAnswer,
    ) -> Result<(), ApiError>;

    /// Submit the whole baseline assessment for scoring.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the service does not confirm success.
    async fn baseline_submit(&self, identity: &Identity) -> Result<(), ApiError>;

    /// Identity-independent question content.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport or decoding failures.
    async fn question_set(&self) -> Result<QuestionSet, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` on transport or decoding failures.
    async fn review_state(&self, identity: &Identity)
    -> Result<Option<AssessmentSession>, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the service does not confirm success.
    async fn review_start(&self, identity: &Identity) -> Result<(), ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the service does not confirm success.
    async fn review_answer(
        &self,
        identity: &Identity,
        test: TestNo,
        index: usize,
        value: i32,
    ) -> Result<(), ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the service does not confirm success.
    async fn review_complete_test(&self, identity: &Identity, test: TestNo)
    -> Result<(), ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the service does not confirm success.
    async fn review_skip_test2(&self, identity: &Identity) -> Result<(), ApiError>;

    /// Score the assessment. The payload may be omitted by the server, in
    /// which case `review_result` is the fallback.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the service does not confirm success.
    async fn review_finish(&self, identity: &Identity)
    -> Result<Option<AssessmentResult>, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` on transport or decoding failures.
    async fn review_result(&self, identity: &Identity) -> Result<ReviewResultEnvelope, ApiError>;
}
