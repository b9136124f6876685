//! Page-side data loading.
//!
//! `DataLoader` pulls JSON resources through the controller with a
//! cache-defeating query parameter and supplies typed fallbacks, so
//! callers always receive a valid value of the resource's shape and
//! never an error. Reference collections (drills, mentorship pages,
//! videos) are additionally memoized for the session: repeated callers
//! within one session share a single fetch, and only constructing a
//! fresh loader clears the memo.

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::lifecycle::{ControllerHandle, Request};
use crate::models::{Announcement, Drill, MentorPage, PracticePlan, RosterEntry, Settings, VideoRef};

// ============================================================================
// Resource paths
// ============================================================================

pub const SETTINGS_PATH: &str = "data/settings.json";
pub const ANNOUNCEMENTS_PATH: &str = "data/announcements.json";
pub const PLANS_PATH: &str = "data/plans.json";
pub const DRILLS_PATH: &str = "data/drills.json";
pub const MENTORSHIP_PATH: &str = "data/mentorship.json";
pub const VIDEOS_PATH: &str = "data/videos.json";
pub const ROSTER_PATH: &str = "data/roster.json";

/// Session-scoped memo for reference collections. One cell per
/// collection keeps the contract typed; the memo is never invalidated by
/// server-side changes, only by constructing a fresh session.
#[derive(Default)]
struct ReferenceMemo {
    drills: OnceCell<Arc<Vec<Drill>>>,
    mentorship: OnceCell<Arc<Vec<MentorPage>>>,
    videos: OnceCell<Arc<Vec<VideoRef>>>,
}

/// Loader for JSON data resources. Construct one per page session.
pub struct DataLoader {
    controller: ControllerHandle,
    memo: ReferenceMemo,
}

impl DataLoader {
    pub fn new(controller: ControllerHandle) -> Self {
        Self {
            controller,
            memo: ReferenceMemo::default(),
        }
    }

    /// Append a timestamp so the read cannot be satisfied by an
    /// opportunistic HTTP cache along the way.
    fn cache_busted(path: &str) -> String {
        format!("{}?t={}", path, Utc::now().timestamp_millis())
    }

    /// Fetch and parse `path`, returning `fallback` on any failure.
    async fn load_with_fallback<T: DeserializeOwned>(&self, path: &str, fallback: T) -> T {
        let response = self
            .controller
            .fetch(Request::get(Self::cache_busted(path)))
            .await;
        match serde_json::from_slice(&response.body) {
            Ok(value) => value,
            Err(e) => {
                debug!(path, error = %e, "Response parse failed, using fallback");
                fallback
            }
        }
    }

    /// Load a JSON sequence resource, defaulting to the empty sequence.
    pub async fn load_resource<T: DeserializeOwned>(&self, path: &str) -> Vec<T> {
        self.load_with_fallback(path, Vec::new()).await
    }

    /// Load team settings, defaulting to `Settings::default()`.
    pub async fn load_settings(&self) -> Settings {
        self.load_with_fallback(SETTINGS_PATH, Settings::default())
            .await
    }

    pub async fn load_announcements(&self) -> Vec<Announcement> {
        self.load_resource(ANNOUNCEMENTS_PATH).await
    }

    pub async fn load_plans(&self) -> Vec<PracticePlan> {
        self.load_resource(PLANS_PATH).await
    }

    pub async fn load_roster(&self) -> Vec<RosterEntry> {
        self.load_resource(ROSTER_PATH).await
    }

    /// Drill library, fetched at most once per session.
    pub async fn load_drills(&self) -> Arc<Vec<Drill>> {
        self.memo
            .drills
            .get_or_init(|| async { Arc::new(self.load_resource(DRILLS_PATH).await) })
            .await
            .clone()
    }

    /// Mentorship pages, fetched at most once per session.
    pub async fn load_mentorship(&self) -> Arc<Vec<MentorPage>> {
        self.memo
            .mentorship
            .get_or_init(|| async { Arc::new(self.load_resource(MENTORSHIP_PATH).await) })
            .await
            .clone()
    }

    /// Video references, fetched at most once per session.
    pub async fn load_videos(&self) -> Arc<Vec<VideoRef>> {
        self.memo
            .videos
            .get_or_init(|| async { Arc::new(self.load_resource(VIDEOS_PATH).await) })
            .await
            .clone()
    }
}
