//! Top-level screen selection.
//!
//! The server encodes all gating (paywall, entitlement) into a single
//! `ScreenState`; the client only layers a one-shot local redirect on top.

use crate::model::{ProgressSnapshot, ScreenState};

/// Local redirect requested by an external navigation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenOverride {
    Review,
}

impl ScreenOverride {
    #[must_use]
    pub fn screen(self) -> ScreenState {
        match self {
            ScreenOverride::Review => ScreenState::Review,
        }
    }
}

/// Resolve the screen to present. A pending override wins; otherwise the
/// snapshot is authoritative.
#[must_use]
pub fn resolve(snapshot: &ProgressSnapshot, local_override: Option<ScreenOverride>) -> ScreenState {
    match local_override {
        Some(redirect) => redirect.screen(),
        None => snapshot.screen_state,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::model::{
        Entitlement, Paywall, PlanStatus, Progress, ProgressSnapshot, ScreenState, TreatmentAccess,
    };

    pub(crate) fn snapshot(screen_state: ScreenState) -> ProgressSnapshot {
        ProgressSnapshot {
            screen_state,
            entitlement: Entitlement {
                plan_status: PlanStatus::Free,
                days_left: 0,
            },
            treatment_access: TreatmentAccess::Full,
            paywall: Paywall::default(),
            stages: Vec::new(),
            progress: Progress::default(),
            baseline: None,
            review: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::snapshot;
    use super::*;
    use crate::model::PlanStatus;

    #[test]
    fn snapshot_state_is_returned_verbatim() {
        for state in ScreenState::ALL {
            assert_eq!(resolve(&snapshot(state), None), state);
        }
    }

    #[test]
    fn review_override_wins_over_every_state() {
        for state in ScreenState::ALL {
            assert_eq!(
                resolve(&snapshot(state), Some(ScreenOverride::Review)),
                ScreenState::Review
            );
        }
    }

    #[test]
    fn paywall_does_not_change_resolution() {
        let mut snap = snapshot(ScreenState::Treating);
        snap.paywall.needed = true;
        snap.entitlement.plan_status = PlanStatus::Expired;
        assert_eq!(resolve(&snap, None), ScreenState::Treating);
    }
}
