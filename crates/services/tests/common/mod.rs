#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use services::{ApiError, BaselineAnswer, ProgressApi};
use treatment_core::model::{
    AssessmentResult, AssessmentResultMeta, AssessmentSession, BaselineNav, BaselineSession,
    BaselineStatus, BaselineStep, Entitlement, Identity, Paywall, PlanStatus, Progress,
    ProgressSnapshot, Question, QuestionSet, ReviewResultEnvelope, ReviewStatus, ScreenState,
    TestNo, TreatmentAccess,
};
use treatment_core::time::fixed_now;

/// How a scripted call should fail.
#[derive(Clone, Debug)]
pub enum Failure {
    Transport,
    Rejected(&'static str),
}

impl Failure {
    fn to_error(&self) -> ApiError {
        match self {
            Failure::Transport => ApiError::Transport("connection reset".into()),
            Failure::Rejected(reason) => ApiError::Rejected {
                reason: Some((*reason).to_string()),
            },
        }
    }
}

/// Mutable server state behind the fake.
pub struct ServerState {
    pub snapshot: ProgressSnapshot,
    pub review: Option<AssessmentSession>,
    pub questions: QuestionSet,
    pub result: AssessmentResult,
    pub finish_returns_result: bool,
    pub baseline: Option<BaselineSession>,
    /// Sessions served after each baseline answer, in order.
    pub baseline_after_answer: VecDeque<BaselineSession>,
    pub baseline_answers: Vec<BaselineAnswer>,
}

/// In-memory `ProgressApi` simulating the remote service.
pub struct FakeApi {
    pub state: Mutex<ServerState>,
    calls: Mutex<Vec<&'static str>>,
    failures: Mutex<HashMap<&'static str, Failure>>,
    gate: Mutex<Option<(&'static str, Arc<Notify>)>>,
}

impl FakeApi {
    pub fn new(state: ServerState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            gate: Mutex::new(None),
        })
    }

    pub fn fail(&self, call: &'static str, failure: Failure) {
        self.failures.lock().unwrap().insert(call, failure);
    }

    pub fn heal(&self, call: &'static str) {
        self.failures.lock().unwrap().remove(call);
    }

    /// Make `call` wait until the returned notify fires.
    pub fn hold(&self, call: &'static str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some((call, Arc::clone(&notify)));
        notify
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &'static str) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut ServerState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    async fn enter(&self, call: &'static str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call);
        let gate = self
            .gate
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(name, _)| *name == call)
            .map(|(_, notify)| Arc::clone(notify));
        if let Some(notify) = gate {
            notify.notified().await;
        }
        match self.failures.lock().unwrap().get(call) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProgressApi for FakeApi {
    async fn fetch_state(&self, _identity: &Identity) -> Result<ProgressSnapshot, ApiError> {
        self.enter("state").await?;
        Ok(self.with_state(|s| s.snapshot.clone()))
    }

    async fn baseline_state(
        &self,
        _identity: &Identity,
    ) -> Result<Option<BaselineSession>, ApiError> {
        self.enter("baseline/state").await?;
        Ok(self.with_state(|s| s.baseline.clone()))
    }

    async fn baseline_start(&self, _identity: &Identity) -> Result<(), ApiError> {
        self.enter("baseline/start").await?;
        self.with_state(|s| {
            s.baseline = Some(consent_step(0, 3, 1));
        });
        Ok(())
    }

    async fn baseline_answer(
        &self,
        _identity: &Identity,
        answer: &BaselineAnswer,
    ) -> Result<(), ApiError> {
        self.enter("baseline/answer").await?;
        self.with_state(|s| {
            s.baseline_answers.push(answer.clone());
            if let Some(next) = s.baseline_after_answer.pop_front() {
                s.baseline = Some(next);
            }
        });
        Ok(())
    }

    async fn baseline_submit(&self, _identity: &Identity) -> Result<(), ApiError> {
        self.enter("baseline/submit").await?;
        self.with_state(|s| {
            if let Some(baseline) = s.baseline.as_mut() {
                baseline.status = BaselineStatus::Completed;
            }
        });
        Ok(())
    }

    async fn question_set(&self) -> Result<QuestionSet, ApiError> {
        self.enter("review/question-set").await?;
        Ok(self.with_state(|s| s.questions.clone()))
    }

    async fn review_state(
        &self,
        _identity: &Identity,
    ) -> Result<Option<AssessmentSession>, ApiError> {
        self.enter("review/state").await?;
        Ok(self.with_state(|s| s.review.clone()))
    }

    async fn review_start(&self, _identity: &Identity) -> Result<(), ApiError> {
        self.enter("review/start").await?;
        self.with_state(|s| {
            let set_id = s.questions.set_id.clone();
            s.review = Some(session(TestNo::One, 0, Some(&set_id)));
        });
        Ok(())
    }

    async fn review_answer(
        &self,
        _identity: &Identity,
        test: TestNo,
        index: usize,
        _value: i32,
    ) -> Result<(), ApiError> {
        self.enter("review/answer").await?;
        self.with_state(|s| {
            if let Some(review) = s.review.as_mut() {
                if review.current_test == test && review.current_index == index {
                    review.current_index += 1;
                }
            }
        });
        Ok(())
    }

    async fn review_complete_test(
        &self,
        _identity: &Identity,
        test: TestNo,
    ) -> Result<(), ApiError> {
        self.enter("review/complete-test").await?;
        self.with_state(|s| {
            if let Some(review) = s.review.as_mut() {
                match test {
                    TestNo::One => {
                        review.test1_completed_at = Some(fixed_now());
                        review.current_test = TestNo::Two;
                        review.current_index = 0;
                    }
                    TestNo::Two => review.test2_completed_at = Some(fixed_now()),
                }
            }
        });
        Ok(())
    }

    async fn review_skip_test2(&self, _identity: &Identity) -> Result<(), ApiError> {
        self.enter("review/skip-test2").await?;
        self.with_state(|s| {
            if let Some(review) = s.review.as_mut() {
                review.test2_skipped_at = Some(fixed_now());
            }
            s.result.meta.did_skip_test2 = true;
        });
        Ok(())
    }

    async fn review_finish(
        &self,
        _identity: &Identity,
    ) -> Result<Option<AssessmentResult>, ApiError> {
        self.enter("review/finish").await?;
        Ok(self.with_state(|s| {
            if let Some(review) = s.review.as_mut() {
                review.status = if s.result.locked {
                    ReviewStatus::CompletedLocked
                } else {
                    ReviewStatus::Unlocked
                };
            }
            s.finish_returns_result.then(|| s.result.clone())
        }))
    }

    async fn review_result(&self, _identity: &Identity) -> Result<ReviewResultEnvelope, ApiError> {
        self.enter("review/result").await?;
        Ok(self.with_state(|s| ReviewResultEnvelope {
            status: s.review.as_ref().map(|r| r.status),
            result: Some(s.result.clone()),
        }))
    }
}

//
// ─── FIXTURES ──────────────────────────────────────────────────────────────────
//

pub fn identity() -> Identity {
    Identity::new("+15550001111")
}

pub fn snapshot(screen_state: ScreenState) -> ProgressSnapshot {
    ProgressSnapshot {
        screen_state,
        entitlement: Entitlement {
            plan_status: PlanStatus::Pro,
            days_left: 20,
        },
        treatment_access: TreatmentAccess::Full,
        paywall: Paywall::default(),
        stages: Vec::new(),
        progress: Progress::default(),
        baseline: None,
        review: None,
    }
}

pub fn question_set(test1: usize, test2: usize) -> QuestionSet {
    let build = |prefix: &str, n: usize| {
        (0..n)
            .map(|i| Question {
                id: format!("{prefix}{i}"),
                text: format!("Question {prefix}{i}"),
                options: Vec::new(),
            })
            .collect()
    };
    QuestionSet {
        set_id: "qs-1".into(),
        test1: build("t1-", test1),
        test2: build("t2-", test2),
    }
}

pub fn session(test: TestNo, index: usize, set_id: Option<&str>) -> AssessmentSession {
    AssessmentSession {
        status: ReviewStatus::InProgress,
        chosen_path: None,
        current_test: test,
        current_index: index,
        test1_completed_at: None,
        test2_completed_at: None,
        test2_skipped_at: None,
        question_set_id: set_id.map(str::to_string),
    }
}

pub fn consent_step(index: usize, total: usize, consent: usize) -> BaselineSession {
    BaselineSession {
        status: BaselineStatus::InProgress,
        nav: BaselineNav {
            index,
            total,
            can_next: true,
            can_submit: false,
            leading_consent_steps: consent,
        },
        step: Some(BaselineStep::Consent {
            id: format!("consent-{index}"),
            text: "I agree".into(),
        }),
    }
}

pub fn question_step(index: usize, total: usize, consent: usize) -> BaselineSession {
    BaselineSession {
        status: BaselineStatus::InProgress,
        nav: BaselineNav {
            index,
            total,
            can_next: true,
            can_submit: index + 1 == total,
            leading_consent_steps: consent,
        },
        step: Some(BaselineStep::Question {
            id: format!("q-{index}"),
            text: "How often?".into(),
            options: Vec::new(),
            selected: None,
        }),
    }
}

pub fn server(review: Option<AssessmentSession>, questions: QuestionSet) -> ServerState {
    ServerState {
        snapshot: snapshot(ScreenState::Review),
        review,
        questions,
        result: AssessmentResult {
            locked: false,
            message: "Your result".into(),
            meta: AssessmentResultMeta::default(),
        },
        finish_returns_result: true,
        baseline: None,
        baseline_after_answer: VecDeque::new(),
        baseline_answers: Vec::new(),
    }
}
