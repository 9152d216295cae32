use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

//
// ─── TEST NUMBER ───────────────────────────────────────────────────────────────
//

/// Which half of the qualifying assessment a cursor points into.
///
/// Travels on the wire as the integers `1` and `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TestNo {
    One,
    Two,
}

impl TestNo {
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            TestNo::One => 1,
            TestNo::Two => 2,
        }
    }
}

impl TryFrom<u8> for TestNo {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TestNo::One),
            2 => Ok(TestNo::Two),
            other => Err(ModelError::InvalidTestNumber(other)),
        }
    }
}

impl From<TestNo> for u8 {
    fn from(value: TestNo) -> Self {
        value.as_u8()
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    InProgress,
    CompletedLocked,
    Unlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChosenPath {
    SkipReview,
    Review,
}

/// Server-side state of the two-part review assessment.
///
/// `current_index` indexes into whichever question list `current_test` selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentSession {
    pub status: ReviewStatus,
    #[serde(default)]
    pub chosen_path: Option<ChosenPath>,
    pub current_test: TestNo,
    #[serde(default)]
    pub current_index: usize,
    #[serde(default)]
    pub test1_completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub test2_completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub test2_skipped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub question_set_id: Option<String>,
}

impl AssessmentSession {
    /// Sessions without a question-set reference have never been started.
    #[must_use]
    pub fn needs_start(&self) -> bool {
        self.question_set_id
            .as_deref()
            .is_none_or(|id| id.trim().is_empty())
    }
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub value: i32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
}

/// Identity-independent question content for both tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub set_id: String,
    #[serde(default)]
    pub test1: Vec<Question>,
    #[serde(default)]
    pub test2: Vec<Question>,
}

impl QuestionSet {
    #[must_use]
    pub fn questions(&self, test: TestNo) -> &[Question] {
        match test {
            TestNo::One => &self.test1,
            TestNo::Two => &self.test2,
        }
    }
}

//
// ─── RESULT ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssessmentResultMeta {
    #[serde(default)]
    pub did_skip_test2: bool,
}

/// Scored outcome returned by the service once the assessment is finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub locked: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub meta: AssessmentResultMeta,
}

/// Which heading the result screen shows. Never affects routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultTitle {
    FullAssessment,
    ShortAssessment,
}

impl AssessmentResult {
    #[must_use]
    pub fn title(&self) -> ResultTitle {
        if self.meta.did_skip_test2 {
            ResultTitle::ShortAssessment
        } else {
            ResultTitle::FullAssessment
        }
    }
}

/// Envelope of the `review/result` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResultEnvelope {
    #[serde(default)]
    pub status: Option<ReviewStatus>,
    #[serde(default)]
    pub result: Option<AssessmentResult>,
}
