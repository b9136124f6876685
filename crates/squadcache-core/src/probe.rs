//! Existence probe for optional assets.
//!
//! Decides whether an optional asset (a drill diagram, a video poster)
//! is actually retrievable, so the rendering layer can skip broken
//! references without surfacing an error. Cache membership in any
//! committed partition short-circuits to `true` with no network
//! traffic; otherwise one header-only request decides, and the answer
//! is memoized per URL for the session.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::fetch::Fetcher;
use crate::lifecycle::cache_key;
use crate::store::CacheStore;

/// Session-scoped probe. Construct one per page session; a fresh
/// session starts with an empty memo.
pub struct ExistenceProbe {
    store: CacheStore,
    fetcher: Arc<dyn Fetcher>,
    base_url: String,
    memo: Mutex<HashMap<String, bool>>,
}

impl ExistenceProbe {
    pub fn new(store: CacheStore, fetcher: Arc<dyn Fetcher>, base_url: &str) -> Self {
        Self {
            store,
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            memo: Mutex::new(HashMap::new()),
        }
    }

    fn absolute(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }

    /// Whether `url` is retrievable. Never errors; a failed check reads
    /// as `false`. Concurrent first probes of the same URL may both
    /// issue the header request; the check is idempotent, so the memo
    /// is not de-duplicated across callers.
    pub async fn probe(&self, url: &str) -> bool {
        if let Some(&known) = self.memo.lock().await.get(url) {
            return known;
        }

        let absolute = self.absolute(url);
        let key = cache_key(&absolute).to_string();
        let exists = if self.store.contains_anywhere(&key) {
            true
        } else {
            let resolvable = self.fetcher.head(&absolute).await.is_ok();
            debug!(url = %key, resolvable, "Existence check went to the network");
            resolvable
        };

        self.memo.lock().await.insert(url.to_string(), exists);
        exists
    }
}
