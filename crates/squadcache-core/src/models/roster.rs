use serde::{Deserialize, Serialize};

/// One roster entry from `data/roster.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterEntry {
    pub name: String,
    pub number: Option<u32>,
    pub position: Option<String>,
    pub guardian_contact: Option<String>,
}
