//! The deploy-time asset manifest.
//!
//! Each deployment ships a manifest naming the shell assets required to
//! boot offline and the data resources worth seeding. The lifecycle
//! controller consumes it exactly once, at install.

use serde::{Deserialize, Serialize};

/// Shell assets required for the application to boot with no network.
const DEFAULT_SHELL_ASSETS: &[&str] = &[
    "index.html",
    "offline.html",
    "css/styles.css",
    "js/app.js",
    "manifest.webmanifest",
];

/// Data resources seeded best-effort at install.
const DEFAULT_DATA_RESOURCES: &[&str] = &[
    "data/settings.json",
    "data/announcements.json",
    "data/plans.json",
    "data/drills.json",
    "data/mentorship.json",
    "data/videos.json",
    "data/roster.json",
];

/// Ordered lists of shell assets and data resources for one deployed
/// version. Shell population is all-or-nothing; data seeding is
/// best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetManifest {
    pub version: String,
    pub shell: Vec<String>,
    pub data: Vec<String>,
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self::for_version("v0.0.0")
    }
}

impl AssetManifest {
    /// The built-in manifest for a given deploy version.
    pub fn for_version(version: &str) -> Self {
        Self {
            version: version.to_string(),
            shell: DEFAULT_SHELL_ASSETS.iter().map(|s| s.to_string()).collect(),
            data: DEFAULT_DATA_RESOURCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
