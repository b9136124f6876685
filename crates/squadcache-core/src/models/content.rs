use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One announcement from `data/announcements.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub body: String,
    pub posted: Option<NaiveDate>,
    pub pinned: bool,
}

/// One practice plan from `data/plans.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticePlan {
    pub id: String,
    pub date: Option<NaiveDate>,
    pub title: String,
    pub focus: Option<String>,
    pub segments: Vec<PlanSegment>,
}

/// A timed block within a practice plan, optionally referencing a drill.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanSegment {
    pub minutes: u32,
    pub activity: String,
    pub drill_id: Option<String>,
}
