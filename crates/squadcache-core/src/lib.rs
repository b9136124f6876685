//! squadcache-core: offline cache and data-synchronization layer for
//! semi-static team reference content (schedules, drill libraries,
//! roster data).
//!
//! The core pieces:
//!
//! - [`lifecycle::Controller`]: background task owning versioned cache
//!   partitions, install/activate transitions, garbage collection
//!   across deployments, and request interception
//! - [`store::CacheStore`]: two partition tiers (shell, data), each
//!   scoped to one deployed version
//! - [`loader::DataLoader`]: cache-busted JSON reads with typed
//!   fallbacks and session memoization of reference collections
//! - [`probe::ExistenceProbe`]: memoized check of whether an optional
//!   asset is actually retrievable
//!
//! Everything page-facing is total: offline, stale caches, and missing
//! assets resolve to typed defaults, never to errors.

pub mod config;
pub mod fetch;
pub mod lifecycle;
pub mod loader;
pub mod models;
pub mod probe;
pub mod store;

pub use config::Config;
pub use fetch::{FetchError, Fetcher, FetchedResponse, HttpFetcher};
pub use lifecycle::{
    Controller, ControllerConfig, ControllerHandle, LifecycleError, LifecycleState, Request,
    Response, ResponseSource, DATA_PREFIX,
};
pub use loader::DataLoader;
pub use models::{
    Announcement, AssetManifest, Drill, MentorPage, PracticePlan, RosterEntry, Settings, VideoRef,
};
pub use probe::ExistenceProbe;
pub use store::{age_display, CachePartition, CacheStore, PartitionName, StoreError, Tier};
