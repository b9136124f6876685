//! squadcache - offline-first cache and sync worker for team reference
//! content.
//!
//! Commands:
//!   sync [--skip-waiting]   install the deployed version, then activate
//!   status                  show cache partitions and their ages
//!   get <path>              fetch a resource through the controller
//!   probe <url>             check whether an optional asset resolves

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use squadcache_core::{
    age_display, AssetManifest, Config, Controller, ControllerConfig, CacheStore, ExistenceProbe,
    Fetcher, HttpFetcher, Request, ResponseSource,
};

/// Path of the deploy manifest under the base URL.
const MANIFEST_PATH: &str = "manifest.json";

/// Initialize the tracing subscriber for logging. The sync worker also
/// logs to a daily file under the cache directory.
fn init_tracing(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter);

    if let Some(dir) = log_dir {
        let appender = tracing_appender::rolling::daily(dir, "sync.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        registry
            .with(fmt::layer().with_ansi(false).with_writer(writer))
            .init();
        Some(guard)
    } else {
        registry.init();
        None
    }
}

fn print_usage() {
    eprintln!("Usage: squadcache <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  sync [--skip-waiting]   install the deployed version, then activate");
    eprintln!("  status                  show cache partitions and their ages");
    eprintln!("  get <path>              fetch a resource through the controller");
    eprintln!("  probe <url>             check whether an optional asset resolves");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    let config = Config::load()?;

    let _guard = match args.get(1).map(String::as_str) {
        Some("sync") => init_tracing(Some(&config.cache_dir()?.join("logs"))),
        _ => init_tracing(None),
    };

    match args.get(1).map(String::as_str) {
        Some("sync") => {
            let skip_waiting = args.iter().any(|a| a == "--skip-waiting");
            cmd_sync(config, skip_waiting).await
        }
        Some("status") => cmd_status(config),
        Some("get") => match args.get(2) {
            Some(path) => cmd_get(config, path).await,
            None => bail!("Usage: squadcache get <path>"),
        },
        Some("probe") => match args.get(2) {
            Some(url) => cmd_probe(config, url).await,
            None => bail!("Usage: squadcache probe <url>"),
        },
        _ => {
            print_usage();
            Ok(())
        }
    }
}

/// Base URL from the BASE_URL env var, falling back to the saved config.
fn resolve_base_url(config: &Config) -> Result<String> {
    if let Ok(url) = std::env::var("BASE_URL") {
        return Ok(url);
    }
    config
        .base_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("No base URL. Set BASE_URL or run sync once with it set."))
}

async fn cmd_sync(mut config: Config, skip_waiting: bool) -> Result<()> {
    let base_url = resolve_base_url(&config)?;
    let fetcher = Arc::new(HttpFetcher::new()?);

    let manifest_url = format!("{}/{}", base_url.trim_end_matches('/'), MANIFEST_PATH);
    let fetched = fetcher
        .get(&manifest_url)
        .await
        .with_context(|| format!("Failed to fetch deploy manifest from {}", manifest_url))?;
    let manifest: AssetManifest =
        serde_json::from_slice(&fetched.body).context("Failed to parse deploy manifest")?;
    info!(version = %manifest.version, "Deploy manifest fetched");

    let store = CacheStore::open(config.cache_dir()?)?;
    let handle = Controller::spawn(
        store.clone(),
        fetcher,
        ControllerConfig {
            base_url: base_url.clone(),
            version: manifest.version.clone(),
            skip_waiting,
        },
    );

    handle.install(manifest.clone()).await?;
    if let Some(version) = handle.update_available() {
        println!("Update ready: {}", version);
    }
    if !skip_waiting {
        handle.activate().await?;
    }
    handle.shutdown().await;

    config.base_url = Some(base_url);
    config.version = Some(manifest.version.clone());
    config.save()?;

    println!("Synced {} ({} state)", manifest.version, handle_state_label(skip_waiting));
    cmd_status(config)
}

fn handle_state_label(skip_waiting: bool) -> &'static str {
    if skip_waiting {
        "fast cutover"
    } else {
        "activated"
    }
}

fn cmd_status(config: Config) -> Result<()> {
    let store = CacheStore::open(config.cache_dir()?)?;
    let mut partitions = store.list_partitions()?;
    partitions.sort_by_key(|p| p.dir_name());

    match &config.version {
        Some(version) => println!("Installed version: {}", version),
        None => println!("Installed version: none (run `squadcache sync`)"),
    }

    if partitions.is_empty() {
        println!("No cache partitions.");
        return Ok(());
    }
    for name in partitions {
        let partition = store.partition(&name);
        let freshness = partition
            .newest_stored_at()
            .map(age_display)
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  {:<32} {:>4} entries   updated {}",
            name.dir_name(),
            partition.entry_count(),
            freshness
        );
    }
    Ok(())
}

async fn cmd_get(config: Config, path: &str) -> Result<()> {
    let base_url = resolve_base_url(&config)?;
    let version = config
        .version
        .clone()
        .ok_or_else(|| anyhow::anyhow!("No installed version. Run `squadcache sync` first."))?;

    let store = CacheStore::open(config.cache_dir()?)?;
    let fetcher = Arc::new(HttpFetcher::new()?);
    let handle = Controller::spawn(
        store,
        fetcher,
        ControllerConfig {
            base_url,
            version,
            skip_waiting: false,
        },
    );

    let response = handle.fetch(Request::get(path)).await;
    handle.shutdown().await;

    let source = match response.source {
        ResponseSource::Network => "network",
        ResponseSource::Cache => "cache",
        ResponseSource::Fallback => "fallback",
    };
    eprintln!("{} ({}, {})", path, source, response.content_type);
    println!("{}", String::from_utf8_lossy(&response.body));
    Ok(())
}

async fn cmd_probe(config: Config, url: &str) -> Result<()> {
    let base_url = resolve_base_url(&config)?;
    let store = CacheStore::open(config.cache_dir()?)?;
    let fetcher = Arc::new(HttpFetcher::new()?);

    let probe = ExistenceProbe::new(store, fetcher, &base_url);
    println!("{}", probe.probe(url).await);
    Ok(())
}
