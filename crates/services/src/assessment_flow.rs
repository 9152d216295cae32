use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use treatment_core::LocalStateError;
use treatment_core::assessment::{
    AssessmentPhase, AssessmentProgress, RemoteStep, Transition, derive_phase, plan, progress,
};
use treatment_core::model::{
    AssessmentResult, AssessmentSession, Identity, Question, QuestionSet, ResultTitle,
    ReviewStatus,
};

use crate::Dispatch;
use crate::api::ProgressApi;
use crate::error::{ApiError, FlowError};
use crate::guard::{InFlight, Liveness};

//
// ─── MODEL ─────────────────────────────────────────────────────────────────────
//

/// Transient, per-identity state. Dropped on identity change or reload.
#[derive(Default)]
struct FlowModel {
    identity: Option<Identity>,
    bootstrapped: bool,
    session: Option<AssessmentSession>,
    questions: Option<Arc<QuestionSet>>,
    selection: Option<i32>,
    result: Option<AssessmentResult>,
    skip_confirmation: bool,
    last_error: Option<FlowError>,
}

impl FlowModel {
    fn for_identity(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            ..Self::default()
        }
    }

    fn phase(&self) -> Option<AssessmentPhase> {
        if let Some(result) = &self.result {
            return Some(AssessmentPhase::from_result(result));
        }
        derive_phase(self.session.as_ref()?, self.questions.as_ref()?)
    }

    fn identity(&self) -> Result<Identity, LocalStateError> {
        self.identity.clone().ok_or(LocalStateError::NoIdentity)
    }
}

fn require_session(session: Option<AssessmentSession>) -> Result<AssessmentSession, ApiError> {
    session.ok_or_else(|| ApiError::Rejected {
        reason: Some("session_missing".into()),
    })
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Drives the two-part review assessment.
///
/// Compound transitions are executed as ordered remote steps; local state is
/// only committed after every step succeeded. At most one action runs at a
/// time and overlapping invocations are dropped.
pub struct AssessmentFlow {
    api: Arc<dyn ProgressApi>,
    model: Mutex<FlowModel>,
    action: InFlight,
    bootstrap: InFlight,
    liveness: Liveness,
}

impl AssessmentFlow {
    #[must_use]
    pub fn new(api: Arc<dyn ProgressApi>) -> Self {
        Self {
            api,
            model: Mutex::new(FlowModel::default()),
            action: InFlight::default(),
            bootstrap: InFlight::default(),
            liveness: Liveness::default(),
        }
    }

    fn model(&self) -> MutexGuard<'_, FlowModel> {
        self.model.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reset(&self, model: &mut FlowModel, identity: Identity) {
        self.liveness.invalidate();
        self.action.reset();
        self.bootstrap.reset();
        *model = FlowModel::for_identity(identity);
    }

    fn fail(&self, err: ApiError) -> FlowError {
        let err = FlowError::from(err);
        warn!(error = %err, "assessment action failed");
        self.model().last_error = Some(err.clone());
        err
    }

    // ─── bootstrap ─────────────────────────────────────────────────────────────

    /// Load session and question content for `identity`, starting a session
    /// if the server has none yet. Runs once per identity; repeated or
    /// overlapping calls are dropped.
    ///
    /// # Errors
    ///
    /// Returns the mapped remote failure. A failed bootstrap may be retried.
    pub async fn bootstrap(&self, identity: Identity) -> Result<Dispatch, FlowError> {
        {
            let mut model = self.model();
            if model.identity.as_ref() != Some(&identity) {
                debug!(?identity, "assessment identity changed");
                self.reset(&mut model, identity.clone());
            } else if model.bootstrapped {
                return Ok(Dispatch::Dropped);
            }
        }

        let Some(_guard) = self.bootstrap.try_enter() else {
            debug!("assessment bootstrap already running; dropped");
            return Ok(Dispatch::Dropped);
        };
        let ticket = self.liveness.ticket();

        let loaded = self.load(&identity).await;
        if !self.liveness.is_current(ticket) {
            return Ok(Dispatch::Stale);
        }

        let (session, questions, result) = loaded.map_err(|err| self.fail(err))?;
        let mut model = self.model();
        info!(
            set_id = %questions.set_id,
            test = session.current_test.as_u8(),
            index = session.current_index,
            "assessment bootstrapped"
        );
        model.session = Some(session);
        model.questions = Some(Arc::new(questions));
        model.result = result;
        model.bootstrapped = true;
        model.last_error = None;
        Ok(Dispatch::Applied)
    }

    async fn load(
        &self,
        identity: &Identity,
    ) -> Result<(AssessmentSession, QuestionSet, Option<AssessmentResult>), ApiError> {
        let session = self.api.review_state(identity).await?;
        let questions = self.api.question_set().await?;

        let session = match session {
            Some(session) if !session.needs_start() => session,
            _ => {
                debug!("no assessment session; starting one");
                self.api.review_start(identity).await?;
                require_session(self.api.review_state(identity).await?)?
            }
        };

        // A finished session needs its stored result for the result screen.
        let result = match session.status {
            ReviewStatus::InProgress => None,
            ReviewStatus::CompletedLocked | ReviewStatus::Unlocked => {
                self.api.review_result(identity).await?.result
            }
        };
        Ok((session, questions, result))
    }

    /// Discard all transient state, release guards and bootstrap again.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidLocalState` if no identity was ever set, or
    /// the bootstrap failure.
    pub async fn reload(&self) -> Result<Dispatch, FlowError> {
        let identity = {
            let mut model = self.model();
            let identity = model.identity()?;
            self.reset(&mut model, identity.clone());
            identity
        };
        info!("assessment reload requested");
        self.bootstrap(identity).await
    }

    /// Stop applying results of calls still in flight.
    pub fn teardown(&self) {
        self.liveness.shutdown();
    }

    // ─── queries ───────────────────────────────────────────────────────────────

    /// Current phase, `None` until bootstrapped or while the active test has
    /// no questions.
    #[must_use]
    pub fn phase(&self) -> Option<AssessmentPhase> {
        self.model().phase()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<Question> {
        let model = self.model();
        let (test, index) = model.phase()?.active_question()?;
        model.questions.as_ref()?.questions(test).get(index).cloned()
    }

    #[must_use]
    pub fn progress(&self) -> Option<AssessmentProgress> {
        let model = self.model();
        Some(progress(model.session.as_ref()?, model.questions.as_ref()?))
    }

    #[must_use]
    pub fn selection(&self) -> Option<i32> {
        self.model().selection
    }

    pub fn select(&self, value: i32) {
        self.model().selection = Some(value);
    }

    pub fn clear_selection(&self) {
        self.model().selection = None;
    }

    #[must_use]
    pub fn result(&self) -> Option<AssessmentResult> {
        self.model().result.clone()
    }

    #[must_use]
    pub fn result_title(&self) -> Option<ResultTitle> {
        self.model().result.as_ref().map(AssessmentResult::title)
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.action.is_busy() || self.bootstrap.is_busy()
    }

    #[must_use]
    pub fn skip_confirmation_open(&self) -> bool {
        self.model().skip_confirmation
    }

    #[must_use]
    pub fn last_error(&self) -> Option<FlowError> {
        self.model().last_error.clone()
    }

    // ─── answers ───────────────────────────────────────────────────────────────

    /// Record the selected value for the active question and refresh the
    /// session so the server-side cursor advance becomes visible.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidLocalState` without a selection or active
    /// question (no request is made), otherwise the mapped remote failure.
    pub async fn submit_answer(&self) -> Result<Dispatch, FlowError> {
        let (identity, test, index, value) = {
            let model = self.model();
            let identity = model.identity()?;
            let phase = model.phase().ok_or(LocalStateError::NotReady)?;
            let (test, index) = phase
                .active_question()
                .ok_or(LocalStateError::NoCurrentQuestion)?;
            let value = model.selection.ok_or(LocalStateError::NoSelection)?;
            (identity, test, index, value)
        };

        let Some(_guard) = self.action.try_enter() else {
            debug!("assessment action in flight; answer dropped");
            return Ok(Dispatch::Dropped);
        };
        let ticket = self.liveness.ticket();
        debug!(test = test.as_u8(), index, "submitting answer");

        let outcome = async {
            self.api.review_answer(&identity, test, index, value).await?;
            require_session(self.api.review_state(&identity).await?)
        }
        .await;
        if !self.liveness.is_current(ticket) {
            return Ok(Dispatch::Stale);
        }

        let session = outcome.map_err(|err| self.fail(err))?;
        let mut model = self.model();
        model.session = Some(session);
        model.selection = None;
        model.last_error = None;
        Ok(Dispatch::Applied)
    }

    // ─── transitions ───────────────────────────────────────────────────────────

    /// `Test1EndOfTest → Test2Active`.
    ///
    /// # Errors
    ///
    /// See [`AssessmentFlow::run_transition`].
    pub async fn continue_to_test2(&self) -> Result<Dispatch, FlowError> {
        self.run_transition(Transition::ContinueToTest2).await
    }

    /// `Test2EndOfTest → Result*`.
    ///
    /// # Errors
    ///
    /// See [`AssessmentFlow::run_transition`].
    pub async fn finish_test2(&self) -> Result<Dispatch, FlowError> {
        self.run_transition(Transition::FinishTest2).await
    }

    /// Open the skip confirmation dialog.
    ///
    /// # Errors
    ///
    /// Returns `LocalStateError::ActionUnavailable` outside `Test1EndOfTest`
    /// and `Test2Active`.
    pub fn request_skip(&self) -> Result<(), FlowError> {
        let mut model = self.model();
        let phase = model.phase().ok_or(LocalStateError::NotReady)?;
        plan(phase, Transition::SkipTest2)?;
        model.skip_confirmation = true;
        Ok(())
    }

    pub fn cancel_skip(&self) {
        self.model().skip_confirmation = false;
    }

    /// Run the skip path after the user confirmed it.
    ///
    /// # Errors
    ///
    /// Returns `LocalStateError::ActionUnavailable` if no confirmation is
    /// open, otherwise see [`AssessmentFlow::run_transition`].
    pub async fn confirm_skip(&self) -> Result<Dispatch, FlowError> {
        if !self.model().skip_confirmation {
            return Err(LocalStateError::ActionUnavailable.into());
        }
        let dispatch = self.run_transition(Transition::SkipTest2).await?;
        if dispatch == Dispatch::Applied {
            self.model().skip_confirmation = false;
        }
        Ok(dispatch)
    }

    /// Execute every remote step of `transition` in order, then commit.
    ///
    /// If any step fails the controller keeps its pre-transition state.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidLocalState` if the transition is not defined
    /// for the current phase, otherwise the first remote failure.
    pub async fn run_transition(&self, transition: Transition) -> Result<Dispatch, FlowError> {
        let (identity, steps) = {
            let model = self.model();
            let identity = model.identity()?;
            let phase = model.phase().ok_or(LocalStateError::NotReady)?;
            (identity, plan(phase, transition)?)
        };

        let Some(_guard) = self.action.try_enter() else {
            debug!(?transition, "assessment action in flight; transition dropped");
            return Ok(Dispatch::Dropped);
        };
        let ticket = self.liveness.ticket();
        debug!(?transition, ?steps, "running assessment transition");

        let outcome = async {
            let result = self.execute(&identity, &steps).await?;
            let refreshed = self.api.review_state(&identity).await;
            Ok::<_, ApiError>((result, refreshed))
        }
        .await;
        if !self.liveness.is_current(ticket) {
            return Ok(Dispatch::Stale);
        }

        let (result, refreshed) = outcome.map_err(|err| self.fail(err))?;
        match refreshed {
            Ok(session) => {
                let mut model = self.model();
                if let Some(session) = session {
                    model.session = Some(session);
                }
                if result.is_some() {
                    model.result = result;
                }
                model.selection = None;
                model.last_error = None;
                info!(?transition, phase = ?model.phase(), "assessment transition applied");
                Ok(Dispatch::Applied)
            }
            Err(err) if result.is_some() => {
                // The finish payload alone settles the terminal phase.
                warn!(error = %err, "session refresh failed after finish");
                let mut model = self.model();
                model.result = result;
                model.selection = None;
                Ok(Dispatch::Applied)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    async fn execute(
        &self,
        identity: &Identity,
        steps: &[RemoteStep],
    ) -> Result<Option<AssessmentResult>, ApiError> {
        let mut result = None;
        for step in steps {
            debug!(?step, "assessment step");
            match *step {
                RemoteStep::CompleteTest(test) => {
                    self.api.review_complete_test(identity, test).await?;
                }
                RemoteStep::SkipTest2 => self.api.review_skip_test2(identity).await?,
                RemoteStep::Finish => {
                    result = match self.api.review_finish(identity).await? {
                        Some(result) => Some(result),
                        None => self.api.review_result(identity).await?.result,
                    };
                }
            }
        }
        Ok(result)
    }
}
