use serde::{Deserialize, Serialize};

/// Team-wide display settings served from `data/settings.json`.
///
/// The loader guarantees callers always receive a complete `Settings`
/// value; missing fields fill from `Default`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub team_name: String,
    pub theme: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            team_name: String::new(),
            theme: "auto".to_string(),
        }
    }
}
