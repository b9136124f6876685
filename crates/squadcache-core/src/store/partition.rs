//! One on-disk cache partition: a mapping from request URL to the most
//! recently stored response body and headers.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::manager::StoreError;

/// Maximum length of the readable slug in an entry file name.
const KEY_SLUG_MAX: usize = 48;

/// Stored response headers and bookkeeping for one cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMeta {
    pub url: String,
    pub content_type: Option<String>,
    pub stored_at: DateTime<Utc>,
}

/// A cache entry read back from disk.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub body: Vec<u8>,
    pub meta: EntryMeta,
}

/// Handle to one partition directory. Entries are full replacements per
/// URL: a `put` overwrites whatever was stored before, never merges.
#[derive(Debug, Clone)]
pub struct CachePartition {
    dir: PathBuf,
}

impl CachePartition {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// File stem for a URL: a readable slug plus a hash so distinct URLs
    /// never collide on sanitization.
    fn entry_stem(url: &str) -> String {
        let mut hasher = DefaultHasher::new();
        url.hash(&mut hasher);
        let slug: String = url
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .take(KEY_SLUG_MAX)
            .collect();
        format!("{}-{:016x}", slug, hasher.finish())
    }

    fn body_path(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.bin", Self::entry_stem(url)))
    }

    fn meta_path(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.meta.json", Self::entry_stem(url)))
    }

    /// Store a response for `url`, replacing any previous entry.
    /// The body lands before the metadata, so a reader never observes an
    /// entry whose body is missing.
    pub fn put(&self, url: &str, body: &[u8], content_type: Option<&str>) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.body_path(url), body)?;

        let meta = EntryMeta {
            url: url.to_string(),
            content_type: content_type.map(|s| s.to_string()),
            stored_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&meta)?;
        std::fs::write(self.meta_path(url), contents)?;
        Ok(())
    }

    /// Whether an entry for `url` is present.
    pub fn contains(&self, url: &str) -> bool {
        self.meta_path(url).exists()
    }

    /// Read back the entry for `url`. Unreadable metadata is treated as
    /// an absent entry rather than an error; a partially populated
    /// partition carries no sentinel distinguishing it from a complete
    /// one.
    pub fn get(&self, url: &str) -> Result<Option<CachedEntry>, StoreError> {
        let meta_path = self.meta_path(url);
        if !meta_path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&meta_path)?;
        let meta: EntryMeta = match serde_json::from_str(&contents) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(url, error = %e, "Unreadable cache entry metadata, treating as absent");
                return Ok(None);
            }
        };

        let body = std::fs::read(self.body_path(url))?;
        Ok(Some(CachedEntry { body, meta }))
    }

    /// Number of entries currently stored.
    pub fn entry_count(&self) -> usize {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return 0;
        };
        entries
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".meta.json"))
            .count()
    }

    /// Timestamp of the most recently stored entry, if any.
    pub fn newest_stored_at(&self) -> Option<DateTime<Utc>> {
        let entries = std::fs::read_dir(&self.dir).ok()?;
        entries
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".meta.json"))
            .filter_map(|e| {
                let contents = std::fs::read_to_string(e.path()).ok()?;
                let meta: EntryMeta = serde_json::from_str(&contents).ok()?;
                Some(meta.stored_at)
            })
            .max()
    }
}
