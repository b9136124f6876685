//! Shared test fixtures: an in-memory origin behind the `Fetcher` seam
//! and helpers to deploy a version into a temp store.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use squadcache_core::{
    AssetManifest, Controller, ControllerConfig, ControllerHandle, CacheStore, FetchError,
    FetchedResponse, Fetcher,
};

pub const BASE_URL: &str = "https://team.example";

/// In-memory origin. Responses are keyed by canonical URL (query string
/// ignored, the way a static file server ignores cache-bust params).
pub struct StaticFetcher {
    responses: Mutex<HashMap<String, FetchedResponse>>,
    offline: AtomicBool,
    get_log: Mutex<Vec<String>>,
    head_log: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
            get_log: Mutex::new(Vec::new()),
            head_log: Mutex::new(Vec::new()),
        })
    }

    fn canonical(url: &str) -> &str {
        url.split('?').next().unwrap_or(url)
    }

    pub fn insert(&self, path: &str, body: &[u8], content_type: &str) {
        let url = format!("{}/{}", BASE_URL, path.trim_start_matches('/'));
        self.responses.lock().unwrap().insert(
            url,
            FetchedResponse {
                body: body.to_vec(),
                content_type: Some(content_type.to_string()),
            },
        );
    }

    pub fn remove(&self, path: &str) {
        let url = format!("{}/{}", BASE_URL, path.trim_start_matches('/'));
        self.responses.lock().unwrap().remove(&url);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of GET requests seen for a path, cache-bust params folded.
    pub fn get_count(&self, path: &str) -> usize {
        let url = format!("{}/{}", BASE_URL, path.trim_start_matches('/'));
        self.get_log.lock().unwrap().iter().filter(|u| **u == url).count()
    }

    /// Number of HEAD requests seen for a path.
    pub fn head_count(&self, path: &str) -> usize {
        let url = format!("{}/{}", BASE_URL, path.trim_start_matches('/'));
        self.head_log.lock().unwrap().iter().filter(|u| **u == url).count()
    }

    pub fn total_head_count(&self) -> usize {
        self.head_log.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn get(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        let canonical = Self::canonical(url).to_string();
        self.get_log.lock().unwrap().push(canonical.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Network("simulated offline".to_string()));
        }
        match self.responses.lock().unwrap().get(&canonical) {
            Some(response) => Ok(response.clone()),
            None => Err(FetchError::Http {
                status: 404,
                url: url.to_string(),
            }),
        }
    }

    async fn head(&self, url: &str) -> Result<(), FetchError> {
        let canonical = Self::canonical(url).to_string();
        self.head_log.lock().unwrap().push(canonical.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Network("simulated offline".to_string()));
        }
        if self.responses.lock().unwrap().contains_key(&canonical) {
            Ok(())
        } else {
            Err(FetchError::Http {
                status: 404,
                url: url.to_string(),
            })
        }
    }
}

/// Populate the origin with a small but complete deployment.
pub fn seed_site(fetcher: &StaticFetcher) {
    fetcher.insert("index.html", b"<html>home</html>", "text/html");
    fetcher.insert("offline.html", b"<html>offline</html>", "text/html");
    fetcher.insert("css/styles.css", b"body{}", "text/css");
    fetcher.insert(
        "data/roster.json",
        br#"[{"name":"A. Rivera","number":7},{"name":"B. Chen","number":12}]"#,
        "application/json",
    );
    fetcher.insert(
        "data/drills.json",
        br#"[{"id":"d1","name":"3v2 Break","tags":["offense"]}]"#,
        "application/json",
    );
    fetcher.insert(
        "data/settings.json",
        br#"{"team_name":"Northside U12","theme":"dark"}"#,
        "application/json",
    );
}

/// Manifest matching `seed_site`.
pub fn test_manifest(version: &str) -> AssetManifest {
    AssetManifest {
        version: version.to_string(),
        shell: vec![
            "index.html".to_string(),
            "offline.html".to_string(),
            "css/styles.css".to_string(),
        ],
        data: vec![
            "data/roster.json".to_string(),
            "data/drills.json".to_string(),
            "data/settings.json".to_string(),
        ],
    }
}

pub fn spawn_controller(
    store: &CacheStore,
    fetcher: &Arc<StaticFetcher>,
    version: &str,
    skip_waiting: bool,
) -> ControllerHandle {
    Controller::spawn(
        store.clone(),
        fetcher.clone(),
        ControllerConfig {
            base_url: BASE_URL.to_string(),
            version: version.to_string(),
            skip_waiting,
        },
    )
}

/// Install and activate `version`, returning its controller handle.
pub async fn deploy(
    store: &CacheStore,
    fetcher: &Arc<StaticFetcher>,
    version: &str,
) -> ControllerHandle {
    let handle = spawn_controller(store, fetcher, version, false);
    handle.install(test_manifest(version)).await.unwrap();
    handle.activate().await.unwrap();
    handle
}

pub fn temp_store() -> (tempfile::TempDir, CacheStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::open(dir.path().to_path_buf()).unwrap();
    (dir, store)
}
