//! Store-level operations: partition creation, staging commit,
//! enumeration, and removal.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use super::name::{PartitionName, STAGING_SUFFIX};
use super::partition::CachePartition;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache metadata error: {0}")]
    Meta(#[from] serde_json::Error),
}

/// Root of all cache partitions.
/// Clone is cheap - the store holds only the root path.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn open(root: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn partition_dir(&self, name: &PartitionName) -> PathBuf {
        self.root.join(name.dir_name())
    }

    /// Handle to a partition, whether or not it exists on disk yet.
    pub fn partition(&self, name: &PartitionName) -> CachePartition {
        CachePartition::new(self.partition_dir(name))
    }

    /// Handle to the staging directory for `name`. Staged entries become
    /// visible only after `commit_staging`.
    pub fn staging_partition(&self, name: &PartitionName) -> Result<CachePartition, StoreError> {
        let dir = self.staging_dir(name);
        if dir.exists() {
            // Leftovers from an interrupted install must not leak in.
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;
        Ok(CachePartition::new(dir))
    }

    fn staging_dir(&self, name: &PartitionName) -> PathBuf {
        self.root
            .join(format!("{}{}", name.dir_name(), STAGING_SUFFIX))
    }

    /// Atomically publish a fully staged partition: the rename either
    /// lands completely or not at all.
    pub fn commit_staging(&self, name: &PartitionName) -> Result<(), StoreError> {
        let target = self.partition_dir(name);
        if target.exists() {
            std::fs::remove_dir_all(&target)?;
        }
        std::fs::rename(self.staging_dir(name), target)?;
        Ok(())
    }

    /// Drop an uncommitted staging directory.
    pub fn discard_staging(&self, name: &PartitionName) -> Result<(), StoreError> {
        let dir = self.staging_dir(name);
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        Ok(())
    }

    /// Enumerate committed partitions by parsing directory names.
    /// Staging directories and foreign directories are skipped.
    pub fn list_partitions(&self) -> Result<Vec<PartitionName>, StoreError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let dir_name = entry.file_name();
            match PartitionName::parse(&dir_name.to_string_lossy()) {
                Some(name) => names.push(name),
                None => debug!(dir = %dir_name.to_string_lossy(), "Skipping non-partition directory"),
            }
        }
        Ok(names)
    }

    pub fn remove_partition(&self, name: &PartitionName) -> Result<(), StoreError> {
        let dir = self.partition_dir(name);
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        Ok(())
    }

    /// Whether any committed partition holds an entry for `url`. Used by
    /// the existence probe to avoid network checks for cached assets;
    /// enumeration failures read as a miss.
    pub fn contains_anywhere(&self, url: &str) -> bool {
        let Ok(names) = self.list_partitions() else {
            return false;
        };
        names.iter().any(|name| self.partition(name).contains(url))
    }
}

/// Human-readable age for a cache timestamp, coarsened the way the
/// status display wants it.
pub fn age_display(stored_at: DateTime<Utc>) -> String {
    let minutes = (Utc::now() - stored_at).num_minutes();
    if minutes < 1 {
        // Covers clock skew as well
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        if minutes % 60 >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        if (minutes % 1440) / 60 >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Tier;
    use chrono::Duration;

    fn store() -> (tempfile::TempDir, CacheStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_staged_partition_invisible_until_commit() {
        let (_dir, store) = store();
        let name = PartitionName::new(Tier::Shell, "v1.0.0");

        let staging = store.staging_partition(&name).unwrap();
        staging.put("index.html", b"<html>", Some("text/html")).unwrap();
        assert!(store.list_partitions().unwrap().is_empty());

        store.commit_staging(&name).unwrap();
        assert_eq!(store.list_partitions().unwrap(), vec![name.clone()]);
        assert!(store.partition(&name).contains("index.html"));
    }

    #[test]
    fn test_discarded_staging_leaves_no_trace() {
        let (_dir, store) = store();
        let name = PartitionName::new(Tier::Shell, "v1.0.0");

        let staging = store.staging_partition(&name).unwrap();
        staging.put("index.html", b"<html>", None).unwrap();
        store.discard_staging(&name).unwrap();

        assert!(store.list_partitions().unwrap().is_empty());
        assert!(!store.partition(&name).exists());
    }

    #[test]
    fn test_commit_replaces_prior_partition_of_same_name() {
        let (_dir, store) = store();
        let name = PartitionName::new(Tier::Data, "v1.0.0");
        store.partition(&name).put("data/a.json", b"old", None).unwrap();

        let staging = store.staging_partition(&name).unwrap();
        staging.put("data/b.json", b"new", None).unwrap();
        store.commit_staging(&name).unwrap();

        let committed = store.partition(&name);
        assert!(!committed.contains("data/a.json"));
        assert!(committed.contains("data/b.json"));
    }

    #[test]
    fn test_contains_anywhere_spans_partitions() {
        let (_dir, store) = store();
        let shell = PartitionName::new(Tier::Shell, "v1.0.0");
        store.partition(&shell).put("img/d7.png", b"png", None).unwrap();

        assert!(store.contains_anywhere("img/d7.png"));
        assert!(!store.contains_anywhere("img/missing.png"));
    }

    #[test]
    fn test_age_display_buckets() {
        assert_eq!(age_display(Utc::now()), "just now");
        assert_eq!(age_display(Utc::now() - Duration::minutes(5)), "5m ago");
        assert_eq!(age_display(Utc::now() - Duration::minutes(95)), "2h ago");
        assert_eq!(age_display(Utc::now() - Duration::days(3)), "3d ago");
    }
}
