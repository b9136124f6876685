//! Data models for squad reference content.
//!
//! This module contains the typed records for every data resource the
//! sync layer delivers:
//!
//! - `Settings`: team-wide display settings
//! - `Announcement`, `PracticePlan`: schedule content
//! - `Drill`, `MentorPage`, `VideoRef`: reference library content
//! - `RosterEntry`: roster data
//! - `AssetManifest`: the deploy-time manifest consumed at install
//!
//! Every record derives `Default` and deserializes with `#[serde(default)]`,
//! so a partial or empty JSON document still produces a complete value.

pub mod content;
pub mod library;
pub mod manifest;
pub mod roster;
pub mod settings;

pub use content::{Announcement, PlanSegment, PracticePlan};
pub use library::{Drill, MentorPage, VideoRef};
pub use manifest::AssetManifest;
pub use roster::RosterEntry;
pub use settings::Settings;
