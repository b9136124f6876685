//! Cache lifecycle controller.
//!
//! The controller owns partition creation, population, garbage
//! collection, and request interception for one deployed version. It
//! runs as a dedicated background task; pages reach it only through the
//! request channel, never through shared memory.
//!
//! Lifecycle: `Uninstalled -> Installing -> InstalledWaiting -> Active`.
//! Install populates the shell partition all-or-nothing and seeds the
//! data partition best-effort. Activate deletes every partition whose
//! `(tier, version)` does not match this controller's version, which is
//! the sole mechanism bounding cache growth across deployments.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::fetch::{FetchError, Fetcher};
use crate::models::AssetManifest;
use crate::store::{CacheStore, PartitionName, StoreError, Tier};

// ============================================================================
// Constants
// ============================================================================

/// Path prefix that routes a request to the network-first data strategy.
pub const DATA_PREFIX: &str = "data/";

/// Buffer size for the controller's request channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Content type for data responses and the typed-empty fallback.
const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type assumed when the origin supplied none.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Served for a shell request when the cache misses, the network fails,
/// and the cached offline page is unavailable too.
const OFFLINE_FALLBACK_HTML: &str =
    "<!doctype html><html><body><p>Offline. Reconnect to load this page.</p></body></html>";

// ============================================================================
// Requests and responses
// ============================================================================

/// An intercepted page request, as a path relative to the deploy origin.
#[derive(Debug, Clone)]
pub struct Request {
    pub path: String,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Where a response's bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    Fallback,
}

/// A response delivered to the page. Interception is total: every
/// request produces one of these, never an error.
#[derive(Debug, Clone)]
pub struct Response {
    pub body: Vec<u8>,
    pub content_type: String,
    pub source: ResponseSource,
}

impl Response {
    /// The typed-empty fallback for a data resource: an empty JSON
    /// collection, so callers parse a valid document.
    pub fn empty_collection() -> Self {
        Self {
            body: b"[]".to_vec(),
            content_type: JSON_CONTENT_TYPE.to_string(),
            source: ResponseSource::Fallback,
        }
    }

    /// Last-resort shell fallback when no cached offline page exists.
    pub fn offline_page() -> Self {
        Self {
            body: OFFLINE_FALLBACK_HTML.as_bytes().to_vec(),
            content_type: "text/html".to_string(),
            source: ResponseSource::Fallback,
        }
    }
}

/// Strip the query string from a URL before using it as a cache key, so
/// cache-busted reads of a resource share one entry with its fallback
/// lookups.
pub(crate) fn cache_key(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// Whether a request path falls under the data-resource prefix.
fn is_data_path(path: &str) -> bool {
    let path = path.trim_start_matches('/');
    cache_key(path).starts_with(DATA_PREFIX)
}

// ============================================================================
// Lifecycle state and errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninstalled,
    Installing,
    InstalledWaiting,
    Active,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Uninstalled => write!(f, "uninstalled"),
            LifecycleState::Installing => write!(f, "installing"),
            LifecycleState::InstalledWaiting => write!(f, "installed-waiting"),
            LifecycleState::Active => write!(f, "active"),
        }
    }
}

#[derive(Error, Debug)]
pub enum LifecycleError {
    /// A shell-manifest asset could not be fetched during install. Fatal
    /// to the whole install; nothing is committed.
    #[error("shell asset missing during install: {url}: {source}")]
    InstallAssetMissing { url: String, source: FetchError },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("controller task is gone")]
    ControllerGone,
}

// ============================================================================
// Controller task
// ============================================================================

/// Configuration for one controller instance. A controller serves
/// exactly one deployed version.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub base_url: String,
    pub version: String,
    /// Activate immediately after a successful install instead of
    /// waiting for an explicit activate request (fast cutover).
    pub skip_waiting: bool,
}

enum ControllerMsg {
    Install {
        manifest: AssetManifest,
        reply: oneshot::Sender<Result<(), LifecycleError>>,
    },
    Activate {
        reply: oneshot::Sender<Result<(), LifecycleError>>,
    },
    Fetch {
        request: Request,
        reply: oneshot::Sender<Response>,
    },
    Shutdown,
}

/// Cloneable handle pages use to talk to the controller task.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<ControllerMsg>,
    state_rx: watch::Receiver<LifecycleState>,
    update_rx: watch::Receiver<Option<String>>,
}

impl ControllerHandle {
    /// Populate the shell and data partitions for this version from the
    /// deploy manifest. All-or-nothing for shell assets; best-effort for
    /// data resources.
    pub async fn install(&self, manifest: AssetManifest) -> Result<(), LifecycleError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ControllerMsg::Install {
                manifest,
                reply: reply_tx,
            })
            .await
            .map_err(|_| LifecycleError::ControllerGone)?;
        reply_rx.await.map_err(|_| LifecycleError::ControllerGone)?
    }

    /// Garbage-collect partitions from other versions and start serving.
    pub async fn activate(&self) -> Result<(), LifecycleError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ControllerMsg::Activate { reply: reply_tx })
            .await
            .map_err(|_| LifecycleError::ControllerGone)?;
        reply_rx.await.map_err(|_| LifecycleError::ControllerGone)?
    }

    /// Intercept one request. Total: a controller that is gone or a
    /// handler that failed still yields the documented fallback.
    pub async fn fetch(&self, request: Request) -> Response {
        let fallback = Self::fallback_for(&request);
        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = self
            .tx
            .send(ControllerMsg::Fetch {
                request,
                reply: reply_tx,
            })
            .await;
        if sent.is_err() {
            return fallback;
        }
        reply_rx.await.unwrap_or(fallback)
    }

    fn fallback_for(request: &Request) -> Response {
        if is_data_path(&request.path) {
            Response::empty_collection()
        } else {
            Response::offline_page()
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state_rx.borrow()
    }

    /// Version of a newly installed deployment waiting behind an active
    /// older one, if any. Presentation of the signal is the UI's job.
    pub fn update_available(&self) -> Option<String> {
        self.update_rx.borrow().clone()
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(ControllerMsg::Shutdown).await;
    }
}

pub struct Controller;

impl Controller {
    /// Spawn the controller task for one version and return its handle.
    ///
    /// Install and activate are processed to completion before the next
    /// message, so the task stays alive until their population/cleanup
    /// work settles. Intercepted fetches are spawned and run
    /// concurrently with no ordering guarantee across resources.
    pub fn spawn(
        store: CacheStore,
        fetcher: Arc<dyn Fetcher>,
        config: ControllerConfig,
    ) -> ControllerHandle {
        let (tx, mut rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let (state_tx, state_rx) = watch::channel(LifecycleState::Uninstalled);
        let (update_tx, update_rx) = watch::channel(None);

        let inner = Arc::new(Inner {
            store,
            fetcher,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            version: config.version,
        });
        let skip_waiting = config.skip_waiting;

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match msg {
                    ControllerMsg::Install { manifest, reply } => {
                        let _ = state_tx.send(LifecycleState::Installing);
                        let had_other_versions = inner.other_versions_present();

                        let result = match inner.install(&manifest).await {
                            Ok(()) if skip_waiting => {
                                let activated = inner.activate();
                                if activated.is_ok() {
                                    let _ = state_tx.send(LifecycleState::Active);
                                }
                                activated
                            }
                            Ok(()) => {
                                let _ = state_tx.send(LifecycleState::InstalledWaiting);
                                if had_other_versions {
                                    let _ = update_tx.send(Some(inner.version.clone()));
                                }
                                Ok(())
                            }
                            Err(e) => {
                                let _ = state_tx.send(LifecycleState::Uninstalled);
                                Err(e)
                            }
                        };
                        let _ = reply.send(result);
                    }
                    ControllerMsg::Activate { reply } => {
                        let result = inner.activate();
                        if result.is_ok() {
                            let _ = state_tx.send(LifecycleState::Active);
                            let _ = update_tx.send(None);
                        }
                        let _ = reply.send(result);
                    }
                    ControllerMsg::Fetch { request, reply } => {
                        let inner = Arc::clone(&inner);
                        tokio::spawn(async move {
                            let response = inner.handle_fetch(&request).await;
                            let _ = reply.send(response);
                        });
                    }
                    ControllerMsg::Shutdown => break,
                }
            }
            debug!("Controller task exiting");
        });

        ControllerHandle {
            tx,
            state_rx,
            update_rx,
        }
    }
}

// ============================================================================
// Controller internals
// ============================================================================

struct Inner {
    store: CacheStore,
    fetcher: Arc<dyn Fetcher>,
    base_url: String,
    version: String,
}

impl Inner {
    fn shell_name(&self) -> PartitionName {
        PartitionName::new(Tier::Shell, &self.version)
    }

    fn data_name(&self) -> PartitionName {
        PartitionName::new(Tier::Data, &self.version)
    }

    fn absolute(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    fn other_versions_present(&self) -> bool {
        match self.store.list_partitions() {
            Ok(names) => names.iter().any(|n| n.version != self.version),
            Err(e) => {
                warn!(error = %e, "Could not enumerate partitions for update check");
                false
            }
        }
    }

    /// Install for this version: stage and commit the shell partition
    /// (any single asset failure aborts with nothing committed), then
    /// seed the data partition, swallowing individual failures.
    async fn install(&self, manifest: &AssetManifest) -> Result<(), LifecycleError> {
        let shell_name = self.shell_name();
        info!(
            version = %self.version,
            assets = manifest.shell.len(),
            "Installing shell partition"
        );

        let staging = self.store.staging_partition(&shell_name)?;
        for asset in &manifest.shell {
            let url = self.absolute(asset);
            match self.fetcher.get(&url).await {
                Ok(fetched) => {
                    staging.put(
                        cache_key(&url),
                        &fetched.body,
                        fetched.content_type.as_deref(),
                    )?;
                }
                Err(source) => {
                    if let Err(e) = self.store.discard_staging(&shell_name) {
                        warn!(error = %e, "Could not discard staging after failed install");
                    }
                    return Err(LifecycleError::InstallAssetMissing { url, source });
                }
            }
        }
        self.store.commit_staging(&shell_name)?;

        // Best-effort, unordered data seeding. A first install may still
        // proceed without full data.
        let data = self.store.partition(&self.data_name());
        let fetches = manifest.data.iter().map(|resource| {
            let url = self.absolute(resource);
            async move {
                match self.fetcher.get(&url).await {
                    Ok(fetched) => Some((url, fetched)),
                    Err(e) => {
                        warn!(url = %url, error = %e, "Data seed fetch failed, continuing");
                        None
                    }
                }
            }
        });
        let mut seeded = 0usize;
        for (url, fetched) in join_all(fetches).await.into_iter().flatten() {
            match data.put(cache_key(&url), &fetched.body, fetched.content_type.as_deref()) {
                Ok(()) => seeded += 1,
                Err(e) => warn!(url = %url, error = %e, "Data seed write failed, continuing"),
            }
        }
        info!(
            version = %self.version,
            seeded,
            total = manifest.data.len(),
            "Install complete"
        );
        Ok(())
    }

    /// Delete every partition from another version, then serve.
    fn activate(&self) -> Result<(), LifecycleError> {
        for name in self.store.list_partitions()? {
            if name.version != self.version {
                info!(partition = %name, "Removing stale cache partition");
                self.store.remove_partition(&name)?;
            }
        }
        info!(version = %self.version, "Activated");
        Ok(())
    }

    async fn handle_fetch(&self, request: &Request) -> Response {
        if is_data_path(&request.path) {
            self.fetch_data(request).await
        } else {
            self.fetch_shell(request).await
        }
    }

    /// Network-first with write-through. Fallback chain: live network
    /// response, most recently cached entry, typed-empty collection.
    async fn fetch_data(&self, request: &Request) -> Response {
        let url = self.absolute(&request.path);
        let key = cache_key(&url).to_string();
        let partition = self.store.partition(&self.data_name());

        match self.fetcher.get(&url).await {
            Ok(fetched) => {
                // Write-through failure degrades future offline reads but
                // must not fail the live response.
                if let Err(e) = partition.put(&key, &fetched.body, fetched.content_type.as_deref())
                {
                    warn!(url = %key, error = %e, "Write-through to data partition failed");
                }
                Response {
                    body: fetched.body,
                    content_type: fetched
                        .content_type
                        .unwrap_or_else(|| JSON_CONTENT_TYPE.to_string()),
                    source: ResponseSource::Network,
                }
            }
            Err(e) => {
                debug!(url = %key, error = %e, "Network fetch failed, falling back to cache");
                match partition.get(&key) {
                    Ok(Some(entry)) => Response {
                        body: entry.body,
                        content_type: entry
                            .meta
                            .content_type
                            .unwrap_or_else(|| JSON_CONTENT_TYPE.to_string()),
                        source: ResponseSource::Cache,
                    },
                    Ok(None) => Response::empty_collection(),
                    Err(e) => {
                        warn!(url = %key, error = %e, "Cache read failed, serving empty fallback");
                        Response::empty_collection()
                    }
                }
            }
        }
    }

    /// Cache-first from the shell partition, then network (without
    /// write-through; the shell refreshes only on install of a new
    /// version), then the cached offline page.
    async fn fetch_shell(&self, request: &Request) -> Response {
        let url = self.absolute(&request.path);
        let key = cache_key(&url).to_string();
        let shell = self.store.partition(&self.shell_name());

        match shell.get(&key) {
            Ok(Some(entry)) => {
                return Response {
                    body: entry.body,
                    content_type: entry
                        .meta
                        .content_type
                        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                    source: ResponseSource::Cache,
                }
            }
            Ok(None) => {}
            Err(e) => warn!(url = %key, error = %e, "Shell cache read failed"),
        }

        match self.fetcher.get(&url).await {
            Ok(fetched) => Response {
                body: fetched.body,
                content_type: fetched
                    .content_type
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                source: ResponseSource::Network,
            },
            Err(e) => {
                debug!(url = %key, error = %e, "Shell fetch failed, serving offline page");
                let offline_url = self.absolute("offline.html");
                match shell.get(cache_key(&offline_url)) {
                    Ok(Some(entry)) => Response {
                        body: entry.body,
                        content_type: entry
                            .meta
                            .content_type
                            .unwrap_or_else(|| "text/html".to_string()),
                        source: ResponseSource::Fallback,
                    },
                    _ => Response::offline_page(),
                }
            }
        }
    }
}
