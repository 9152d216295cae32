use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::assessment::ChosenPath;
use crate::model::baseline::BaselineStatus;
use crate::model::ids::DayId;
use crate::model::plan::Stage;

//
// ─── SCREEN ────────────────────────────────────────────────────────────────────
//

/// Top-level screen the server wants the client to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenState {
    Idle,
    BaselineAssessment,
    BaselineResult,
    ChoosePath,
    Review,
    Treating,
}

impl ScreenState {
    pub const ALL: [ScreenState; 6] = [
        ScreenState::Idle,
        ScreenState::BaselineAssessment,
        ScreenState::BaselineResult,
        ScreenState::ChoosePath,
        ScreenState::Review,
        ScreenState::Treating,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScreenState::Idle => "idle",
            ScreenState::BaselineAssessment => "baseline_assessment",
            ScreenState::BaselineResult => "baseline_result",
            ScreenState::ChoosePath => "choose_path",
            ScreenState::Review => "review",
            ScreenState::Treating => "treating",
        }
    }
}

//
// ─── ENTITLEMENT / ACCESS ──────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Free,
    Pro,
    Expired,
    Expiring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub plan_status: PlanStatus,
    #[serde(default)]
    pub days_left: u32,
}

/// Whether the active day may be entered or only previewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentAccess {
    Full,
    FrozenCurrent,
    ArchiveOnly,
}

impl TreatmentAccess {
    #[must_use]
    pub fn allows_entry(self) -> bool {
        matches!(self, TreatmentAccess::Full | TreatmentAccess::FrozenCurrent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaywallReason {
    StartTreatment,
    ContinueTreatment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Paywall {
    pub needed: bool,
    #[serde(default)]
    pub reason: Option<PaywallReason>,
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Locked,
    Active,
    InProgress,
    Done,
    Completed,
    #[serde(other)]
    Unknown,
}

/// Per-day progress row, keyed by `day_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayProgressRow {
    pub day_id: DayId,
    pub status: DayStatus,
    #[serde(default)]
    pub completion_percent: f64,
}

impl DayProgressRow {
    /// A row is done when the status says so or the percentage reached 100.
    /// Either signal alone is sufficient.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self.status, DayStatus::Done | DayStatus::Completed)
            || self.completion_percent >= 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub active_day_id: Option<DayId>,
    /// Explicit active stage; falls back to the first stage marked active.
    #[serde(default)]
    pub active_stage_code: Option<String>,
    #[serde(default)]
    pub day_progress: Vec<DayProgressRow>,
    #[serde(default)]
    pub xp_total: u32,
    #[serde(default)]
    pub streak: u32,
}

impl Progress {
    #[must_use]
    pub fn row(&self, day_id: DayId) -> Option<&DayProgressRow> {
        self.day_progress.iter().find(|row| row.day_id == day_id)
    }

    #[must_use]
    pub fn is_day_done(&self, day_id: DayId) -> bool {
        self.row(day_id).is_some_and(DayProgressRow::is_done)
    }
}

//
// ─── SESSION MILESTONES ────────────────────────────────────────────────────────
//

/// Baseline session summary carried by the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineMilestone {
    pub status: BaselineStatus,
}

/// Review session summary carried by the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReviewMilestone {
    #[serde(default)]
    pub chosen_path: Option<ChosenPath>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub test1_completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub test2_completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub test2_skipped_at: Option<DateTime<Utc>>,
}

impl ReviewMilestone {
    #[must_use]
    pub fn has_any_completion(&self) -> bool {
        self.completed_at.is_some()
            || self.test2_completed_at.is_some()
            || self.test1_completed_at.is_some()
            || self.test2_skipped_at.is_some()
    }
}

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// Complete server-provided progression state for one identity.
///
/// Replaced wholesale on every refresh; never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub screen_state: ScreenState,
    pub entitlement: Entitlement,
    pub treatment_access: TreatmentAccess,
    #[serde(default)]
    pub paywall: Paywall,
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub progress: Progress,
    #[serde(default)]
    pub baseline: Option<BaselineMilestone>,
    #[serde(default)]
    pub review: Option<ReviewMilestone>,
}
