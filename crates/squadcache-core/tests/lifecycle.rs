//! Lifecycle controller behavior: atomic install, version cutover and
//! garbage collection, and the two fetch strategies.

mod common;

use common::*;
use squadcache_core::{
    LifecycleError, LifecycleState, PartitionName, Request, ResponseSource, Tier,
};

#[tokio::test]
async fn install_populates_shell_and_seeds_data() {
    let (_dir, store) = temp_store();
    let fetcher = StaticFetcher::new();
    seed_site(&fetcher);

    let handle = spawn_controller(&store, &fetcher, "v1.0.0", false);
    handle.install(test_manifest("v1.0.0")).await.unwrap();
    assert_eq!(handle.state(), LifecycleState::InstalledWaiting);

    let shell = store.partition(&PartitionName::new(Tier::Shell, "v1.0.0"));
    assert_eq!(shell.entry_count(), 3);
    assert!(shell.contains(&format!("{}/index.html", BASE_URL)));

    let data = store.partition(&PartitionName::new(Tier::Data, "v1.0.0"));
    assert_eq!(data.entry_count(), 3);
    assert!(data.contains(&format!("{}/data/roster.json", BASE_URL)));
}

#[tokio::test]
async fn data_seed_failures_do_not_fail_install() {
    let (_dir, store) = temp_store();
    let fetcher = StaticFetcher::new();
    seed_site(&fetcher);
    fetcher.remove("data/roster.json");

    let handle = spawn_controller(&store, &fetcher, "v1.0.0", false);
    handle.install(test_manifest("v1.0.0")).await.unwrap();

    let data = store.partition(&PartitionName::new(Tier::Data, "v1.0.0"));
    assert!(!data.contains(&format!("{}/data/roster.json", BASE_URL)));
    assert!(data.contains(&format!("{}/data/drills.json", BASE_URL)));
}

// Scenario D: one shell asset unreachable -> install fails, nothing
// committed, the previous version keeps serving.
#[tokio::test]
async fn install_is_all_or_nothing_for_shell_assets() {
    let (_dir, store) = temp_store();
    let fetcher = StaticFetcher::new();
    seed_site(&fetcher);
    let v1 = deploy(&store, &fetcher, "v1.0.0").await;

    fetcher.remove("css/styles.css");
    let v2 = spawn_controller(&store, &fetcher, "v1.1.0", false);
    let err = v2.install(test_manifest("v1.1.0")).await.unwrap_err();
    assert!(matches!(err, LifecycleError::InstallAssetMissing { .. }));
    assert_eq!(v2.state(), LifecycleState::Uninstalled);

    let mut partitions = store.list_partitions().unwrap();
    partitions.sort_by_key(|p| p.dir_name());
    assert_eq!(
        partitions,
        vec![
            PartitionName::new(Tier::Data, "v1.0.0"),
            PartitionName::new(Tier::Shell, "v1.0.0"),
        ]
    );

    // The old version still serves its shell from cache while offline.
    fetcher.set_offline(true);
    let response = v1.fetch(Request::get("index.html")).await;
    assert_eq!(response.source, ResponseSource::Cache);
    assert_eq!(response.body, b"<html>home</html>");
}

// Scenario A: after activating v1.1.0, no v1.0.0 partition remains.
#[tokio::test]
async fn activation_garbage_collects_prior_versions() {
    let (_dir, store) = temp_store();
    let fetcher = StaticFetcher::new();
    seed_site(&fetcher);

    deploy(&store, &fetcher, "v1.0.0").await;
    deploy(&store, &fetcher, "v1.1.0").await;

    let mut partitions = store.list_partitions().unwrap();
    partitions.sort_by_key(|p| p.dir_name());
    assert_eq!(
        partitions,
        vec![
            PartitionName::new(Tier::Data, "v1.1.0"),
            PartitionName::new(Tier::Shell, "v1.1.0"),
        ]
    );
}

#[tokio::test]
async fn skip_waiting_activates_immediately_after_install() {
    let (_dir, store) = temp_store();
    let fetcher = StaticFetcher::new();
    seed_site(&fetcher);
    deploy(&store, &fetcher, "v1.0.0").await;

    let v2 = spawn_controller(&store, &fetcher, "v1.1.0", true);
    v2.install(test_manifest("v1.1.0")).await.unwrap();

    assert_eq!(v2.state(), LifecycleState::Active);
    let versions: Vec<_> = store
        .list_partitions()
        .unwrap()
        .into_iter()
        .map(|p| p.version)
        .collect();
    assert!(versions.iter().all(|v| v == "v1.1.0"));
}

#[tokio::test]
async fn new_install_behind_active_version_signals_update() {
    let (_dir, store) = temp_store();
    let fetcher = StaticFetcher::new();
    seed_site(&fetcher);
    deploy(&store, &fetcher, "v1.0.0").await;

    let v2 = spawn_controller(&store, &fetcher, "v1.1.0", false);
    assert_eq!(v2.update_available(), None);
    v2.install(test_manifest("v1.1.0")).await.unwrap();

    assert_eq!(v2.update_available(), Some("v1.1.0".to_string()));
    assert_eq!(v2.state(), LifecycleState::InstalledWaiting);

    v2.activate().await.unwrap();
    assert_eq!(v2.update_available(), None);
    assert_eq!(v2.state(), LifecycleState::Active);
}

// Write-through invariant: bytes returned equal the freshest network
// bytes, and the data partition then holds exactly those bytes.
#[tokio::test]
async fn data_fetch_writes_through_freshest_bytes() {
    let (_dir, store) = temp_store();
    let fetcher = StaticFetcher::new();
    seed_site(&fetcher);
    let handle = deploy(&store, &fetcher, "v1.0.0").await;

    fetcher.insert("data/roster.json", br#"[{"name":"C. Diaz"}]"#, "application/json");
    let response = handle.fetch(Request::get("data/roster.json?t=1")).await;
    assert_eq!(response.source, ResponseSource::Network);
    assert_eq!(response.body, br#"[{"name":"C. Diaz"}]"#);

    let data = store.partition(&PartitionName::new(Tier::Data, "v1.0.0"));
    let entry = data
        .get(&format!("{}/data/roster.json", BASE_URL))
        .unwrap()
        .unwrap();
    assert_eq!(entry.body, response.body);
}

// Offline fallback returns the most recently cached entry, never an
// older one.
#[tokio::test]
async fn offline_data_fetch_serves_most_recent_cached_entry() {
    let (_dir, store) = temp_store();
    let fetcher = StaticFetcher::new();
    seed_site(&fetcher);
    let handle = deploy(&store, &fetcher, "v1.0.0").await;

    fetcher.insert("data/roster.json", br#"[{"name":"C. Diaz"}]"#, "application/json");
    handle.fetch(Request::get("data/roster.json")).await;

    fetcher.set_offline(true);
    let response = handle.fetch(Request::get("data/roster.json?t=99")).await;
    assert_eq!(response.source, ResponseSource::Cache);
    assert_eq!(response.body, br#"[{"name":"C. Diaz"}]"#);
}

#[tokio::test]
async fn uncached_data_fetch_offline_yields_typed_empty_fallback() {
    let (_dir, store) = temp_store();
    let fetcher = StaticFetcher::new();
    seed_site(&fetcher);
    let handle = deploy(&store, &fetcher, "v1.0.0").await;

    fetcher.set_offline(true);
    let response = handle.fetch(Request::get("data/never-seen.json")).await;
    assert_eq!(response.source, ResponseSource::Fallback);
    assert_eq!(response.body, b"[]");
    assert_eq!(response.content_type, "application/json");
}

#[tokio::test]
async fn shell_requests_serve_cache_first() {
    let (_dir, store) = temp_store();
    let fetcher = StaticFetcher::new();
    seed_site(&fetcher);
    let handle = deploy(&store, &fetcher, "v1.0.0").await;

    // Origin content changes, but the shell stays pinned to install time.
    fetcher.insert("index.html", b"<html>redesign</html>", "text/html");
    let response = handle.fetch(Request::get("index.html")).await;
    assert_eq!(response.source, ResponseSource::Cache);
    assert_eq!(response.body, b"<html>home</html>");
}

#[tokio::test]
async fn unknown_shell_path_offline_serves_cached_offline_page() {
    let (_dir, store) = temp_store();
    let fetcher = StaticFetcher::new();
    seed_site(&fetcher);
    let handle = deploy(&store, &fetcher, "v1.0.0").await;

    fetcher.set_offline(true);
    let response = handle.fetch(Request::get("drills/d1.html")).await;
    assert_eq!(response.source, ResponseSource::Fallback);
    assert_eq!(response.body, b"<html>offline</html>");
}

#[tokio::test]
async fn unknown_shell_path_online_falls_back_to_network() {
    let (_dir, store) = temp_store();
    let fetcher = StaticFetcher::new();
    seed_site(&fetcher);
    let handle = deploy(&store, &fetcher, "v1.0.0").await;

    fetcher.insert("extra/about.html", b"<html>about</html>", "text/html");
    let response = handle.fetch(Request::get("extra/about.html")).await;
    assert_eq!(response.source, ResponseSource::Network);
    assert_eq!(response.body, b"<html>about</html>");

    // No write-through for shell paths: a repeat offline request cannot
    // be served from the shell partition.
    fetcher.set_offline(true);
    let offline = handle.fetch(Request::get("extra/about.html")).await;
    assert_eq!(offline.source, ResponseSource::Fallback);
}

#[tokio::test]
async fn fetch_after_shutdown_still_returns_fallback() {
    let (_dir, store) = temp_store();
    let fetcher = StaticFetcher::new();
    seed_site(&fetcher);
    let handle = deploy(&store, &fetcher, "v1.0.0").await;

    handle.shutdown().await;
    // Give the task a moment to drain the channel and exit.
    tokio::task::yield_now().await;

    let response = handle.fetch(Request::get("data/roster.json")).await;
    assert_eq!(response.source, ResponseSource::Fallback);
    assert_eq!(response.body, b"[]");
}
