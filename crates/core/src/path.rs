//! Treatment path classification.
//!
//! Flattens the stage/day tree into the ordered node sequence drawn as a
//! zig-zag path, tagging each day with what the user may do with it.

use crate::model::{
    BaselineMilestone, BaselineStatus, DayId, Progress, ProgressSnapshot, ReviewMilestone, Stage,
    StageId, TreatmentAccess,
};

//
// ─── NODES ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    fn for_counter(counter: usize) -> Self {
        if counter % 2 == 0 {
            Side::Left
        } else {
            Side::Right
        }
    }
}

/// Raw accessibility flags of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayAccess {
    pub available: bool,
    pub done: bool,
    pub enterable: bool,
    pub previewable: bool,
    pub locked: bool,
}

/// Collapsed class used by renderers and tap handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessClass {
    Enterable,
    Previewable,
    /// Active day that the current access level does not allow entering.
    Blocked,
    Locked,
}

impl DayAccess {
    #[must_use]
    pub fn class(&self) -> AccessClass {
        if self.enterable {
            AccessClass::Enterable
        } else if self.previewable {
            AccessClass::Previewable
        } else if self.locked {
            AccessClass::Locked
        } else {
            AccessClass::Blocked
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayNode {
    pub day_id: DayId,
    pub stage_id: StageId,
    pub day_number_in_stage: u32,
    pub global_day_number: u32,
    pub side: Side,
    pub access: DayAccess,
    /// Last day of the whole program; the connecting path ends here.
    pub is_terminal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageHeader {
    pub stage_id: StageId,
    pub code: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultsNode {
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathNode {
    Results(ResultsNode),
    StageHeader(StageHeader),
    Day(DayNode),
}

/// What tapping a node does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    OpenResults,
    EnterActiveDay(DayId),
    PreviewDay { day_id: DayId, preview: bool },
}

impl PathNode {
    #[must_use]
    pub fn tap(&self) -> Option<NodeAction> {
        match self {
            PathNode::Results(node) => node.done.then_some(NodeAction::OpenResults),
            PathNode::StageHeader(_) => None,
            PathNode::Day(day) => match day.access.class() {
                AccessClass::Enterable => Some(NodeAction::EnterActiveDay(day.day_id)),
                AccessClass::Previewable => Some(NodeAction::PreviewDay {
                    day_id: day.day_id,
                    preview: true,
                }),
                AccessClass::Blocked | AccessClass::Locked => None,
            },
        }
    }

    #[must_use]
    pub fn as_day(&self) -> Option<&DayNode> {
        match self {
            PathNode::Day(day) => Some(day),
            _ => None,
        }
    }
}

//
// ─── CLASSIFICATION ────────────────────────────────────────────────────────────
//

/// The qualifying-assessment node is done only when all four hold: a
/// completed baseline, a review session, a chosen path and at least one
/// review completion timestamp.
#[must_use]
pub fn results_done(baseline: Option<&BaselineMilestone>, review: Option<&ReviewMilestone>) -> bool {
    let baseline_completed = baseline.is_some_and(|b| b.status == BaselineStatus::Completed);
    let Some(review) = review else {
        return false;
    };
    baseline_completed && review.chosen_path.is_some() && review.has_any_completion()
}

/// Sort order of the active stage, or `None` when no stage resolves.
#[must_use]
pub fn active_stage_order(stages: &[Stage], progress: &Progress) -> Option<i32> {
    let explicit = progress
        .active_stage_code
        .as_deref()
        .and_then(|code| stages.iter().find(|stage| stage.code == code));
    explicit
        .or_else(|| stages.iter().find(|stage| stage.is_active()))
        .map(|stage| stage.sort_order)
}

/// Position (in flattening order) of the day with the highest global number.
/// Ties keep the first one encountered.
fn terminal_position(stages: &[Stage]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (position, day) in stages.iter().flat_map(|stage| &stage.days).enumerate() {
        if best.is_none_or(|(_, number)| day.global_day_number > number) {
            best = Some((position, day.global_day_number));
        }
    }
    best.map(|(position, _)| position)
}

/// Build the ordered node list: results node, then per stage a header
/// followed by its days.
#[must_use]
pub fn classify(
    stages: &[Stage],
    progress: &Progress,
    access: TreatmentAccess,
    results_node_done: bool,
) -> Vec<PathNode> {
    let day_count: usize = stages.iter().map(|stage| stage.days.len()).sum();
    let mut nodes = Vec::with_capacity(1 + stages.len() + day_count);
    nodes.push(PathNode::Results(ResultsNode {
        done: results_node_done,
    }));

    let active_order = active_stage_order(stages, progress);
    let terminal = terminal_position(stages);
    let mut counter = 0_usize;

    for stage in stages {
        nodes.push(PathNode::StageHeader(StageHeader {
            stage_id: stage.id,
            code: stage.code.clone(),
            title: stage.title.clone(),
        }));

        let past_stage = active_order.is_some_and(|order| stage.sort_order < order);
        for day in &stage.days {
            let available = progress.active_day_id == Some(day.id);
            let done = progress.is_day_done(day.id);
            let enterable = available && access.allows_entry();
            let previewable = past_stage || done;
            let locked = !available && !previewable;

            nodes.push(PathNode::Day(DayNode {
                day_id: day.id,
                stage_id: stage.id,
                day_number_in_stage: day.day_number_in_stage,
                global_day_number: day.global_day_number,
                side: Side::for_counter(counter),
                access: DayAccess {
                    available,
                    done,
                    enterable,
                    previewable,
                    locked,
                },
                is_terminal: terminal == Some(counter),
            }));
            counter += 1;
        }
    }

    nodes
}

/// Convenience wrapper deriving every input from a snapshot.
#[must_use]
pub fn classify_snapshot(snapshot: &ProgressSnapshot) -> Vec<PathNode> {
    classify(
        &snapshot.stages,
        &snapshot.progress,
        snapshot.treatment_access,
        results_done(snapshot.baseline.as_ref(), snapshot.review.as_ref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChosenPath, Day, DayProgressRow, DayStatus, StageStatus};
    use crate::time::fixed_now;

    fn day(id: u64, stage: u64, number: u32, global: u32) -> Day {
        Day {
            id: DayId::new(id),
            stage_id: StageId::new(stage),
            day_number_in_stage: number,
            global_day_number: global,
            tasks: Vec::new(),
        }
    }

    fn stage(id: u64, code: &str, sort_order: i32, status: StageStatus, days: Vec<Day>) -> Stage {
        Stage {
            id: StageId::new(id),
            code: code.into(),
            title: format!("Stage {code}"),
            sort_order,
            status,
            days,
        }
    }

    fn done_row(id: u64) -> DayProgressRow {
        DayProgressRow {
            day_id: DayId::new(id),
            status: DayStatus::Done,
            completion_percent: 100.0,
        }
    }

    fn days(nodes: &[PathNode]) -> Vec<&DayNode> {
        nodes.iter().filter_map(PathNode::as_day).collect()
    }

    fn scenario() -> (Vec<Stage>, Progress) {
        let stages = vec![
            stage(1, "A", 0, StageStatus::Active, vec![day(1, 1, 1, 1), day(2, 1, 2, 2)]),
            stage(2, "B", 1, StageStatus::Locked, vec![day(3, 2, 1, 3)]),
        ];
        let progress = Progress {
            active_day_id: Some(DayId::new(2)),
            day_progress: vec![done_row(1)],
            ..Progress::default()
        };
        (stages, progress)
    }

    #[test]
    fn concrete_scenario_classifies_each_day() {
        let (stages, progress) = scenario();
        let nodes = classify(&stages, &progress, TreatmentAccess::Full, false);
        let days = days(&nodes);

        assert_eq!(days[0].access.class(), AccessClass::Previewable);
        assert!(days[0].access.done);
        assert_eq!(days[1].access.class(), AccessClass::Enterable);
        assert!(days[1].access.available);
        assert_eq!(days[2].access.class(), AccessClass::Locked);
    }

    #[test]
    fn node_order_is_results_then_headers_and_days() {
        let (stages, progress) = scenario();
        let nodes = classify(&stages, &progress, TreatmentAccess::Full, false);
        assert!(matches!(nodes[0], PathNode::Results(_)));
        assert!(matches!(&nodes[1], PathNode::StageHeader(h) if h.code == "A"));
        assert!(matches!(&nodes[2], PathNode::Day(d) if d.day_id == DayId::new(1)));
        assert!(matches!(&nodes[3], PathNode::Day(d) if d.day_id == DayId::new(2)));
        assert!(matches!(&nodes[4], PathNode::StageHeader(h) if h.code == "B"));
        assert!(matches!(&nodes[5], PathNode::Day(d) if d.day_id == DayId::new(3)));
        assert_eq!(nodes.len(), 6);
    }

    #[test]
    fn archive_only_blocks_entry_to_active_day() {
        let (stages, progress) = scenario();
        let nodes = classify(&stages, &progress, TreatmentAccess::ArchiveOnly, false);
        let active = days(&nodes)[1].clone();
        assert!(active.access.available);
        assert!(!active.access.enterable);
        assert!(!active.access.locked);
        assert_eq!(active.access.class(), AccessClass::Blocked);
        assert_eq!(PathNode::Day(active).tap(), None);
    }

    #[test]
    fn frozen_current_still_allows_entry() {
        let (stages, progress) = scenario();
        let nodes = classify(&stages, &progress, TreatmentAccess::FrozenCurrent, false);
        assert!(days(&nodes)[1].access.enterable);
    }

    #[test]
    fn three_days_alternate_left_right_left() {
        let stages = vec![stage(
            1,
            "A",
            0,
            StageStatus::Active,
            vec![day(1, 1, 1, 1), day(2, 1, 2, 2), day(3, 1, 3, 3)],
        )];
        let nodes = classify(&stages, &Progress::default(), TreatmentAccess::Full, false);
        let sides: Vec<Side> = days(&nodes).iter().map(|d| d.side).collect();
        assert_eq!(sides, vec![Side::Left, Side::Right, Side::Left]);
    }

    #[test]
    fn headers_do_not_advance_alternation() {
        let (stages, progress) = scenario();
        let nodes = classify(&stages, &progress, TreatmentAccess::Full, false);
        let sides: Vec<Side> = days(&nodes).iter().map(|d| d.side).collect();
        assert_eq!(sides, vec![Side::Left, Side::Right, Side::Left]);
    }

    #[test]
    fn rebuild_restarts_alternation_and_is_idempotent() {
        let (stages, progress) = scenario();
        let first = classify(&stages, &progress, TreatmentAccess::Full, true);
        let second = classify(&stages, &progress, TreatmentAccess::Full, true);
        assert_eq!(first, second);
    }

    #[test]
    fn exactly_one_terminal_day_with_max_global_number() {
        let stages = vec![
            stage(1, "A", 0, StageStatus::Active, vec![day(1, 1, 1, 4), day(2, 1, 2, 9)]),
            stage(2, "B", 1, StageStatus::Locked, vec![day(3, 2, 1, 5)]),
        ];
        let nodes = classify(&stages, &Progress::default(), TreatmentAccess::Full, false);
        let terminal: Vec<DayId> = days(&nodes)
            .iter()
            .filter(|d| d.is_terminal)
            .map(|d| d.day_id)
            .collect();
        assert_eq!(terminal, vec![DayId::new(2)]);
    }

    #[test]
    fn terminal_tie_keeps_first_in_flattening_order() {
        let stages = vec![
            stage(1, "A", 0, StageStatus::Active, vec![day(1, 1, 1, 7)]),
            stage(2, "B", 1, StageStatus::Locked, vec![day(2, 2, 1, 7)]),
        ];
        let nodes = classify(&stages, &Progress::default(), TreatmentAccess::Full, false);
        let flags: Vec<bool> = days(&nodes).iter().map(|d| d.is_terminal).collect();
        assert_eq!(flags, vec![true, false]);
    }

    #[test]
    fn explicit_active_stage_code_wins_over_status() {
        let stages = vec![
            stage(1, "A", 0, StageStatus::Active, vec![day(1, 1, 1, 1)]),
            stage(2, "B", 1, StageStatus::Locked, vec![day(2, 2, 1, 2)]),
            stage(3, "C", 2, StageStatus::Locked, vec![day(3, 3, 1, 3)]),
        ];
        let progress = Progress {
            active_stage_code: Some("C".into()),
            ..Progress::default()
        };
        assert_eq!(active_stage_order(&stages, &progress), Some(2));
        let nodes = classify(&stages, &progress, TreatmentAccess::Full, false);
        let classes: Vec<AccessClass> = days(&nodes).iter().map(|d| d.access.class()).collect();
        assert_eq!(
            classes,
            vec![AccessClass::Previewable, AccessClass::Previewable, AccessClass::Locked]
        );
    }

    #[test]
    fn unresolved_active_stage_leaves_only_done_days_previewable() {
        let stages = vec![
            stage(1, "A", 0, StageStatus::Done, vec![day(1, 1, 1, 1), day(2, 1, 2, 2)]),
            stage(2, "B", 1, StageStatus::Locked, vec![day(3, 2, 1, 3)]),
        ];
        let progress = Progress {
            active_stage_code: Some("missing".into()),
            day_progress: vec![done_row(2)],
            ..Progress::default()
        };
        assert_eq!(active_stage_order(&stages, &progress), None);
        let nodes = classify(&stages, &progress, TreatmentAccess::Full, false);
        let classes: Vec<AccessClass> = days(&nodes).iter().map(|d| d.access.class()).collect();
        assert_eq!(
            classes,
            vec![AccessClass::Locked, AccessClass::Previewable, AccessClass::Locked]
        );
    }

    #[test]
    fn percent_only_done_row_is_previewable_in_future_stage() {
        let (stages, mut progress) = scenario();
        progress.day_progress.push(DayProgressRow {
            day_id: DayId::new(3),
            status: DayStatus::Active,
            completion_percent: 100.0,
        });
        let nodes = classify(&stages, &progress, TreatmentAccess::Full, false);
        assert_eq!(days(&nodes)[2].access.class(), AccessClass::Previewable);
    }

    #[test]
    fn tap_actions_follow_class() {
        let (stages, progress) = scenario();
        let nodes = classify(&stages, &progress, TreatmentAccess::Full, true);
        assert_eq!(nodes[0].tap(), Some(NodeAction::OpenResults));
        assert_eq!(nodes[1].tap(), None);
        assert_eq!(
            nodes[2].tap(),
            Some(NodeAction::PreviewDay {
                day_id: DayId::new(1),
                preview: true
            })
        );
        assert_eq!(nodes[3].tap(), Some(NodeAction::EnterActiveDay(DayId::new(2))));
        assert_eq!(nodes[5].tap(), None);
    }

    // ─── results node ──────────────────────────────────────────────────────────

    fn completed_baseline() -> BaselineMilestone {
        BaselineMilestone {
            status: BaselineStatus::Completed,
        }
    }

    fn review_with_path() -> ReviewMilestone {
        ReviewMilestone {
            chosen_path: Some(ChosenPath::Review),
            ..ReviewMilestone::default()
        }
    }

    #[test]
    fn results_not_done_without_completion_timestamps() {
        assert!(!results_done(Some(&completed_baseline()), Some(&review_with_path())));
    }

    #[test]
    fn any_single_completion_timestamp_completes_results() {
        let setters: [fn(&mut ReviewMilestone); 4] = [
            |r| r.completed_at = Some(fixed_now()),
            |r| r.test2_completed_at = Some(fixed_now()),
            |r| r.test1_completed_at = Some(fixed_now()),
            |r| r.test2_skipped_at = Some(fixed_now()),
        ];
        for set in setters {
            let mut review = review_with_path();
            set(&mut review);
            assert!(results_done(Some(&completed_baseline()), Some(&review)));
        }
    }

    #[test]
    fn each_condition_false_alone_keeps_results_open() {
        let mut review = review_with_path();
        review.test1_completed_at = Some(fixed_now());

        // baseline missing
        assert!(!results_done(None, Some(&review)));
        // baseline not completed
        let in_progress = BaselineMilestone {
            status: BaselineStatus::InProgress,
        };
        assert!(!results_done(Some(&in_progress), Some(&review)));
        // review missing
        assert!(!results_done(Some(&completed_baseline()), None));
        // no chosen path
        let mut no_path = review.clone();
        no_path.chosen_path = None;
        assert!(!results_done(Some(&completed_baseline()), Some(&no_path)));
        // all four hold
        assert!(results_done(Some(&completed_baseline()), Some(&review)));
    }

    #[test]
    fn snapshot_wrapper_uses_session_milestones() {
        let (stages, progress) = scenario();
        let mut snapshot = crate::screen::fixtures::snapshot(crate::model::ScreenState::Treating);
        snapshot.stages = stages;
        snapshot.progress = progress;
        snapshot.baseline = Some(completed_baseline());
        let mut review = review_with_path();
        review.test2_skipped_at = Some(fixed_now());
        snapshot.review = Some(review);

        let nodes = classify_snapshot(&snapshot);
        assert_eq!(nodes[0], PathNode::Results(ResultsNode { done: true }));
    }
}
