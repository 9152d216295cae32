use serde::{Deserialize, Serialize};

use crate::model::ids::{DayId, StageId};

/// Server-reported lifecycle of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Locked,
    Active,
    Done,
    #[serde(other)]
    Unknown,
}

/// A task inside a day. Content is opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTask {
    pub code: String,
    #[serde(default)]
    pub title: String,
}

/// Atomic unit of treatment content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    pub id: DayId,
    pub stage_id: StageId,
    pub day_number_in_stage: u32,
    /// Totally orders all days of the program.
    pub global_day_number: u32,
    #[serde(default)]
    pub tasks: Vec<DayTask>,
}

/// Ordered top-level phase of the program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub code: String,
    pub title: String,
    pub sort_order: i32,
    #[serde(default)]
    pub status: StageStatus,
    #[serde(default)]
    pub days: Vec<Day>,
}

impl Stage {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == StageStatus::Active
    }
}
