//! Pure state derivation for the two-part review assessment.
//!
//! The server advances the cursor; the client derives which phase it is in
//! and which remote steps a user action expands to. Executing the steps is the
//! services layer's job.

use crate::error::LocalStateError;
use crate::model::{AssessmentResult, AssessmentSession, QuestionSet, ReviewStatus, TestNo};

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentPhase {
    Test1Active { index: usize },
    Test1EndOfTest,
    Test2Active { index: usize },
    Test2EndOfTest,
    ResultLocked,
    ResultUnlocked,
}

impl AssessmentPhase {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            AssessmentPhase::Test1Active { .. } => "Test1Active",
            AssessmentPhase::Test1EndOfTest => "Test1EndOfTest",
            AssessmentPhase::Test2Active { .. } => "Test2Active",
            AssessmentPhase::Test2EndOfTest => "Test2EndOfTest",
            AssessmentPhase::ResultLocked => "ResultLocked",
            AssessmentPhase::ResultUnlocked => "ResultUnlocked",
        }
    }

    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            AssessmentPhase::ResultLocked | AssessmentPhase::ResultUnlocked
        )
    }

    /// Test and index of the question awaiting an answer, if any.
    #[must_use]
    pub fn active_question(&self) -> Option<(TestNo, usize)> {
        match *self {
            AssessmentPhase::Test1Active { index } => Some((TestNo::One, index)),
            AssessmentPhase::Test2Active { index } => Some((TestNo::Two, index)),
            _ => None,
        }
    }

    #[must_use]
    pub fn from_result(result: &AssessmentResult) -> Self {
        if result.locked {
            AssessmentPhase::ResultLocked
        } else {
            AssessmentPhase::ResultUnlocked
        }
    }
}

/// Number of questions in the active test.
///
/// An empty list is "not ready" (content missing), never a completed test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionTotal {
    NotReady,
    Ready(usize),
}

impl QuestionTotal {
    #[must_use]
    pub fn of(len: usize) -> Self {
        if len == 0 {
            QuestionTotal::NotReady
        } else {
            QuestionTotal::Ready(len)
        }
    }
}

/// True once the cursor moved past the last question of a non-empty test.
#[must_use]
pub fn is_end_of_test(current_index: usize, question_count: usize) -> bool {
    match QuestionTotal::of(question_count) {
        QuestionTotal::NotReady => false,
        QuestionTotal::Ready(total) => current_index >= total,
    }
}

/// Derive the phase from the server session and the loaded question set.
///
/// Returns `None` while the active test has no questions.
#[must_use]
pub fn derive_phase(session: &AssessmentSession, questions: &QuestionSet) -> Option<AssessmentPhase> {
    match session.status {
        ReviewStatus::CompletedLocked => return Some(AssessmentPhase::ResultLocked),
        ReviewStatus::Unlocked => return Some(AssessmentPhase::ResultUnlocked),
        ReviewStatus::InProgress => {}
    }

    let test = session.current_test;
    let count = questions.questions(test).len();
    if QuestionTotal::of(count) == QuestionTotal::NotReady {
        return None;
    }

    let end = is_end_of_test(session.current_index, count);
    Some(match (test, end) {
        (TestNo::One, false) => AssessmentPhase::Test1Active {
            index: session.current_index,
        },
        (TestNo::One, true) => AssessmentPhase::Test1EndOfTest,
        (TestNo::Two, false) => AssessmentPhase::Test2Active {
            index: session.current_index,
        },
        (TestNo::Two, true) => AssessmentPhase::Test2EndOfTest,
    })
}

/// 1-based position of the active question, for progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssessmentProgress {
    pub test: TestNo,
    pub question_number: usize,
    pub question_total: QuestionTotal,
}

#[must_use]
pub fn progress(session: &AssessmentSession, questions: &QuestionSet) -> AssessmentProgress {
    let total = QuestionTotal::of(questions.questions(session.current_test).len());
    let question_number = match total {
        QuestionTotal::NotReady => 0,
        QuestionTotal::Ready(total) => (session.current_index + 1).min(total),
    };
    AssessmentProgress {
        test: session.current_test,
        question_number,
        question_total: total,
    }
}

//
// ─── TRANSITIONS ───────────────────────────────────────────────────────────────
//

/// User-initiated transition out of an end-of-test or mid-test phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Close test 1 and move on to test 2.
    ContinueToTest2,
    /// Close test 2 and score the assessment.
    FinishTest2,
    /// Skip (the rest of) test 2 and score the assessment.
    SkipTest2,
}

/// A single remote mutation in a compound transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStep {
    CompleteTest(TestNo),
    SkipTest2,
    Finish,
}

/// Expand a transition into its ordered remote steps.
///
/// Every step must succeed for the transition to take effect.
///
/// # Errors
///
/// Returns `LocalStateError::ActionUnavailable` if the transition is not
/// defined for the given phase.
pub fn plan(phase: AssessmentPhase, transition: Transition) -> Result<Vec<RemoteStep>, LocalStateError> {
    use AssessmentPhase as P;
    use RemoteStep as S;

    match (phase, transition) {
        (P::Test1EndOfTest, Transition::ContinueToTest2) => Ok(vec![S::CompleteTest(TestNo::One)]),
        (P::Test1EndOfTest, Transition::SkipTest2) => Ok(vec![
            S::CompleteTest(TestNo::One),
            S::SkipTest2,
            S::Finish,
        ]),
        (P::Test2EndOfTest, Transition::FinishTest2) => {
            Ok(vec![S::CompleteTest(TestNo::Two), S::Finish])
        }
        (P::Test2Active { .. }, Transition::SkipTest2) => Ok(vec![S::SkipTest2, S::Finish]),
        _ => Err(LocalStateError::ActionUnavailable),
    }
}
