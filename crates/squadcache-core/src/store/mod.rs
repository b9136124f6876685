//! Versioned cache partitions for offline data access.
//!
//! The store keeps two partition tiers, each scoped to one deployed
//! version:
//!
//! - shell: assets needed to boot the application offline, populated
//!   all-or-nothing at install and never mutated afterwards
//! - data: mutable JSON resources, updated by write-through on every
//!   successful network read
//!
//! Partition directory names encode `(application id, tier, version)`,
//! so garbage collection across deployments is an exact name match.

pub mod manager;
pub mod name;
pub mod partition;

pub use manager::{age_display, CacheStore, StoreError};
pub use name::{PartitionName, Tier};
pub use partition::{CachedEntry, CachePartition, EntryMeta};
