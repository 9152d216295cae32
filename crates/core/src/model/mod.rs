pub mod assessment;
pub mod baseline;
mod ids;
mod plan;
mod snapshot;

pub use assessment::{
    AssessmentResult, AssessmentResultMeta, AssessmentSession, ChosenPath, Question,
    QuestionOption, QuestionSet, ResultTitle, ReviewResultEnvelope, ReviewStatus, TestNo,
};
pub use baseline::{BaselineNav, BaselineOption, BaselineSession, BaselineStatus, BaselineStep};
pub use ids::{DayId, Identity, ParseIdError, StageId};
pub use plan::{Day, DayTask, Stage, StageStatus};
pub use snapshot::{
    BaselineMilestone, DayProgressRow, DayStatus, Entitlement, Paywall, PaywallReason, PlanStatus,
    Progress, ProgressSnapshot, ReviewMilestone, ScreenState, TreatmentAccess,
};
