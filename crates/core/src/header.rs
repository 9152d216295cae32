use crate::model::{PaywallReason, PlanStatus, ProgressSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanBadge {
    Free,
    Pro,
    Expired,
    Expiring { days_left: u32 },
}

/// Paywall prompt to show, as decided by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaywallPrompt {
    pub reason: Option<PaywallReason>,
}

/// Header shown above the treatment path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressHeader {
    pub xp_total: u32,
    pub streak: u32,
    pub plan: PlanBadge,
    pub paywall: Option<PaywallPrompt>,
}

#[must_use]
pub fn map_progress_header(snapshot: &ProgressSnapshot) -> ProgressHeader {
    let plan = match snapshot.entitlement.plan_status {
        PlanStatus::Free => PlanBadge::Free,
        PlanStatus::Pro => PlanBadge::Pro,
        PlanStatus::Expired => PlanBadge::Expired,
        PlanStatus::Expiring => PlanBadge::Expiring {
            days_left: snapshot.entitlement.days_left,
        },
    };

    let paywall = snapshot.paywall.needed.then_some(PaywallPrompt {
        reason: snapshot.paywall.reason,
    });

    ProgressHeader {
        xp_total: snapshot.progress.xp_total,
        streak: snapshot.progress.streak,
        plan,
        paywall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScreenState;
    use crate::screen::fixtures::snapshot;

    #[test]
    fn days_left_only_shown_when_expiring() {
        let mut snap = snapshot(ScreenState::Treating);
        snap.entitlement.plan_status = PlanStatus::Pro;
        snap.entitlement.days_left = 12;
        assert_eq!(map_progress_header(&snap).plan, PlanBadge::Pro);

        snap.entitlement.plan_status = PlanStatus::Expiring;
        assert_eq!(
            map_progress_header(&snap).plan,
            PlanBadge::Expiring { days_left: 12 }
        );
    }

    #[test]
    fn paywall_prompt_follows_needed_flag() {
        let mut snap = snapshot(ScreenState::Treating);
        snap.paywall.reason = Some(PaywallReason::StartTreatment);
        assert_eq!(map_progress_header(&snap).paywall, None);

        snap.paywall.needed = true;
        assert_eq!(
            map_progress_header(&snap).paywall,
            Some(PaywallPrompt {
                reason: Some(PaywallReason::StartTreatment)
            })
        );
    }

    #[test]
    fn copies_xp_and_streak() {
        let mut snap = snapshot(ScreenState::Idle);
        snap.progress.xp_total = 340;
        snap.progress.streak = 5;
        let header = map_progress_header(&snap);
        assert_eq!((header.xp_total, header.streak), (340, 5));
    }
}
