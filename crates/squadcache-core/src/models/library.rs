use serde::{Deserialize, Serialize};

/// One drill from the drill library (`data/drills.json`).
///
/// `diagram` is an optional asset URL; whether it actually resolves is
/// decided by the existence probe, not by this record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Drill {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub description: String,
    pub diagram: Option<String>,
    pub video_id: Option<String>,
}

/// One mentorship page from `data/mentorship.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MentorPage {
    pub id: String,
    pub title: String,
    pub body: String,
    pub audience: Option<String>,
}

/// One video reference from `data/videos.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoRef {
    pub id: String,
    pub title: String,
    pub url: String,
    pub duration_minutes: Option<u32>,
}
