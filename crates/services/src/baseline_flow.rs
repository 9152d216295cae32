use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use treatment_core::LocalStateError;
use treatment_core::baseline::QuestionPosition;
use treatment_core::model::{BaselineSession, BaselineStatus, BaselineStep, Identity};

use crate::Dispatch;
use crate::api::{BaselineAnswer, BaselinePayload, ProgressApi};
use crate::error::{ApiError, FlowError};
use crate::guard::{InFlight, Liveness};

#[derive(Default)]
struct BaselineModel {
    identity: Option<Identity>,
    session: Option<BaselineSession>,
    selection: Option<usize>,
    submitted: bool,
    last_error: Option<FlowError>,
}

/// What `advance` will do with the current step.
enum Pending {
    Acknowledge { step_id: String },
    Answer { step_id: String, option_index: usize, last: bool },
}

/// Single-cursor controller for the baseline questionnaire.
pub struct BaselineFlow {
    api: Arc<dyn ProgressApi>,
    model: Mutex<BaselineModel>,
    action: InFlight,
    liveness: Liveness,
}

impl BaselineFlow {
    #[must_use]
    pub fn new(api: Arc<dyn ProgressApi>) -> Self {
        Self {
            api,
            model: Mutex::new(BaselineModel::default()),
            action: InFlight::default(),
            liveness: Liveness::default(),
        }
    }

    fn model(&self) -> MutexGuard<'_, BaselineModel> {
        self.model.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fail(&self, err: ApiError) -> FlowError {
        let err = FlowError::from(err);
        warn!(error = %err, "baseline action failed");
        self.model().last_error = Some(err.clone());
        err
    }

    async fn fetch(&self, identity: &Identity) -> Result<BaselineSession, ApiError> {
        self.api
            .baseline_state(identity)
            .await?
            .ok_or_else(|| ApiError::Rejected {
                reason: Some("session_missing".into()),
            })
    }

    /// Fetch the current step, starting a baseline session if none exists.
    ///
    /// # Errors
    ///
    /// Returns the mapped remote failure.
    pub async fn load(&self, identity: Identity) -> Result<Dispatch, FlowError> {
        {
            let mut model = self.model();
            if model.identity.as_ref() != Some(&identity) {
                self.liveness.invalidate();
                self.action.reset();
                *model = BaselineModel {
                    identity: Some(identity.clone()),
                    ..BaselineModel::default()
                };
            }
        }

        let Some(_guard) = self.action.try_enter() else {
            return Ok(Dispatch::Dropped);
        };
        let ticket = self.liveness.ticket();

        let loaded = async {
            match self.api.baseline_state(&identity).await? {
                Some(session) if session.status != BaselineStatus::NotStarted => {
                    Ok::<_, ApiError>(session)
                }
                _ => {
                    debug!("no baseline session; starting one");
                    self.api.baseline_start(&identity).await?;
                    self.fetch(&identity).await
                }
            }
        }
        .await;
        if !self.liveness.is_current(ticket) {
            return Ok(Dispatch::Stale);
        }

        let session = loaded.map_err(|err| self.fail(err))?;
        let mut model = self.model();
        model.session = Some(session);
        model.last_error = None;
        Ok(Dispatch::Applied)
    }

    /// Drop local progress and load the current step again.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidLocalState` if no identity was ever loaded,
    /// otherwise the load failure.
    pub async fn reload(&self) -> Result<Dispatch, FlowError> {
        let identity = {
            let mut model = self.model();
            let identity = model.identity.clone().ok_or(LocalStateError::NoIdentity)?;
            self.liveness.invalidate();
            self.action.reset();
            *model = BaselineModel {
                identity: Some(identity.clone()),
                ..BaselineModel::default()
            };
            identity
        };
        info!("baseline reload requested");
        self.load(identity).await
    }

    #[must_use]
    pub fn session(&self) -> Option<BaselineSession> {
        self.model().session.clone()
    }

    #[must_use]
    pub fn step(&self) -> Option<BaselineStep> {
        self.model().session.as_ref()?.step.clone()
    }

    /// Question-only position of the current question step.
    #[must_use]
    pub fn position(&self) -> Option<QuestionPosition> {
        let model = self.model();
        let session = model.session.as_ref()?;
        matches!(session.step, Some(BaselineStep::Question { .. }))
            .then(|| QuestionPosition::from_nav(&session.nav))
    }

    /// The server reports lost answers; the caller has to reset the assessment.
    #[must_use]
    pub fn requires_reset(&self) -> bool {
        matches!(self.step(), Some(BaselineStep::ReviewMissing { .. }))
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.model().submitted
    }

    pub fn select(&self, option_index: usize) {
        self.model().selection = Some(option_index);
    }

    #[must_use]
    pub fn selection(&self) -> Option<usize> {
        self.model().selection
    }

    #[must_use]
    pub fn last_error(&self) -> Option<FlowError> {
        self.model().last_error.clone()
    }

    pub fn teardown(&self) {
        self.liveness.shutdown();
    }

    fn pending(model: &BaselineModel) -> Result<Pending, LocalStateError> {
        if model.submitted {
            return Err(LocalStateError::ActionUnavailable);
        }
        let session = model.session.as_ref().ok_or(LocalStateError::NotReady)?;
        match session.step.as_ref() {
            Some(BaselineStep::Consent { id, .. }) => Ok(Pending::Acknowledge {
                step_id: id.clone(),
            }),
            Some(BaselineStep::Question { id, selected, .. }) => {
                let option_index = model
                    .selection
                    .or(*selected)
                    .ok_or(LocalStateError::NoSelection)?;
                Ok(Pending::Answer {
                    step_id: id.clone(),
                    option_index,
                    last: QuestionPosition::from_nav(&session.nav).is_last(),
                })
            }
            Some(BaselineStep::ReviewMissing { .. }) => Err(LocalStateError::ResetRequired),
            None => Err(LocalStateError::NoCurrentQuestion),
        }
    }

    /// Post the current step and move on.
    ///
    /// Consent steps are acknowledged. Question steps post the selection; the
    /// last question submits the whole assessment instead of fetching a next
    /// step.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidLocalState` without a selection or on a
    /// `review_missing` step, otherwise the mapped remote failure.
    pub async fn advance(&self) -> Result<Dispatch, FlowError> {
        let (identity, pending) = {
            let model = self.model();
            let identity = model.identity.clone().ok_or(LocalStateError::NoIdentity)?;
            (identity, Self::pending(&model)?)
        };

        let Some(_guard) = self.action.try_enter() else {
            debug!("baseline action in flight; advance dropped");
            return Ok(Dispatch::Dropped);
        };
        let ticket = self.liveness.ticket();

        let outcome = async {
            match pending {
                Pending::Acknowledge { step_id } => {
                    let answer = BaselineAnswer {
                        step_type: "consent",
                        step_id,
                        payload: BaselinePayload::Acknowledged { acknowledged: true },
                    };
                    self.api.baseline_answer(&identity, &answer).await?;
                    self.fetch(&identity).await.map(Some)
                }
                Pending::Answer {
                    step_id,
                    option_index,
                    last,
                } => {
                    let answer = BaselineAnswer {
                        step_type: "question",
                        step_id,
                        payload: BaselinePayload::Choice { option_index },
                    };
                    self.api.baseline_answer(&identity, &answer).await?;
                    if last {
                        self.api.baseline_submit(&identity).await?;
                        Ok(None)
                    } else {
                        self.fetch(&identity).await.map(Some)
                    }
                }
            }
        }
        .await;
        if !self.liveness.is_current(ticket) {
            return Ok(Dispatch::Stale);
        }

        let next = outcome.map_err(|err| self.fail(err))?;
        let mut model = self.model();
        model.selection = None;
        model.last_error = None;
        match next {
            Some(session) => model.session = Some(session),
            None => {
                info!("baseline submitted for scoring");
                model.submitted = true;
            }
        }
        Ok(Dispatch::Applied)
    }
}
