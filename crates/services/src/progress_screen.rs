use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use treatment_core::header::{ProgressHeader, map_progress_header};
use treatment_core::model::{Identity, ProgressSnapshot, ScreenState};
use treatment_core::path::{NodeAction, PathNode, classify_snapshot};
use treatment_core::{LocalStateError, ScreenOverride, resolve};

use crate::Dispatch;
use crate::api::ProgressApi;
use crate::error::FlowError;
use crate::guard::{InFlight, Liveness};

#[derive(Default)]
struct ScreenModel {
    identity: Option<Identity>,
    snapshot: Option<Arc<ProgressSnapshot>>,
    path: Arc<Vec<PathNode>>,
    last_error: Option<FlowError>,
}

/// Owns the current snapshot and the one-shot review redirect.
///
/// Each refresh swaps in a new `Arc<ProgressSnapshot>`; previously handed
/// out snapshots are never modified.
pub struct ProgressScreen {
    api: Arc<dyn ProgressApi>,
    model: Mutex<ScreenModel>,
    review_redirect: AtomicBool,
    refreshing: InFlight,
    liveness: Liveness,
}

impl ProgressScreen {
    #[must_use]
    pub fn new(api: Arc<dyn ProgressApi>) -> Self {
        Self {
            api,
            model: Mutex::new(ScreenModel::default()),
            review_redirect: AtomicBool::new(false),
            refreshing: InFlight::default(),
            liveness: Liveness::default(),
        }
    }

    fn model(&self) -> MutexGuard<'_, ScreenModel> {
        self.model.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch the identity. Everything derived for a previous identity is
    /// dropped and in-flight results for it are ignored.
    pub fn set_identity(&self, identity: Identity) {
        let mut model = self.model();
        if model.identity.as_ref() == Some(&identity) {
            return;
        }
        debug!(?identity, "progress screen identity changed");
        self.liveness.invalidate();
        self.refreshing.reset();
        self.review_redirect.store(false, Ordering::Release);
        *model = ScreenModel {
            identity: Some(identity),
            ..ScreenModel::default()
        };
    }

    /// Redirect to the review screen until the next completed refresh.
    pub fn request_review_redirect(&self) {
        self.review_redirect.store(true, Ordering::Release);
    }

    pub fn clear_review_redirect(&self) {
        self.review_redirect.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn pending_override(&self) -> Option<ScreenOverride> {
        self.review_redirect
            .load(Ordering::Acquire)
            .then_some(ScreenOverride::Review)
    }

    /// Fetch a fresh snapshot and rebuild the derived path.
    ///
    /// A redirect that was pending when the refresh started is consumed once
    /// the refresh succeeds.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidLocalState` without an identity, otherwise
    /// the mapped transport/server error. Local state is untouched on error.
    pub async fn refresh(&self) -> Result<Dispatch, FlowError> {
        let identity = self
            .model()
            .identity
            .clone()
            .ok_or(LocalStateError::NoIdentity)?;
        let Some(_guard) = self.refreshing.try_enter() else {
            debug!("refresh already in flight; dropped");
            return Ok(Dispatch::Dropped);
        };
        let ticket = self.liveness.ticket();
        let redirect_seen = self.review_redirect.load(Ordering::Acquire);

        let fetched = self.api.fetch_state(&identity).await;
        if !self.liveness.is_current(ticket) {
            debug!("stale snapshot discarded");
            return Ok(Dispatch::Stale);
        }

        let mut model = self.model();
        match fetched {
            Ok(snapshot) => {
                let path = classify_snapshot(&snapshot);
                debug!(
                    screen = snapshot.screen_state.as_str(),
                    nodes = path.len(),
                    "snapshot applied"
                );
                model.snapshot = Some(Arc::new(snapshot));
                model.path = Arc::new(path);
                model.last_error = None;
                if redirect_seen {
                    let _ = self.review_redirect.compare_exchange(
                        true,
                        false,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    );
                }
                Ok(Dispatch::Applied)
            }
            Err(err) => {
                let err = FlowError::from(err);
                warn!(error = %err, "snapshot refresh failed");
                model.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Screen to present, `None` before the first snapshot arrived.
    #[must_use]
    pub fn screen(&self) -> Option<ScreenState> {
        let model = self.model();
        model
            .snapshot
            .as_deref()
            .map(|snapshot| resolve(snapshot, self.pending_override()))
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<ProgressSnapshot>> {
        self.model().snapshot.clone()
    }

    /// Path nodes for the current snapshot. Built once per refresh.
    #[must_use]
    pub fn path_nodes(&self) -> Arc<Vec<PathNode>> {
        Arc::clone(&self.model().path)
    }

    #[must_use]
    pub fn header(&self) -> Option<ProgressHeader> {
        self.model().snapshot.as_deref().map(map_progress_header)
    }

    /// Action for tapping the node at `index` of `path_nodes()`.
    #[must_use]
    pub fn tap(&self, index: usize) -> Option<NodeAction> {
        self.model().path.get(index).and_then(PathNode::tap)
    }

    #[must_use]
    pub fn last_error(&self) -> Option<FlowError> {
        self.model().last_error.clone()
    }

    /// Stop applying results of calls still in flight.
    pub fn teardown(&self) {
        self.liveness.shutdown();
    }
}
