//! HTTP fetcher for shell assets and data resources.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client};

use super::FetchError;

/// HTTP request timeout in seconds.
/// 30s allows for slow origins while failing fast enough to fall back.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A successfully fetched response body with its content type.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

/// Network seam used by the controller, loaders, and existence probe.
///
/// `get` returns the response body for a 2xx response and an error for
/// everything else. `head` succeeds iff the resource is retrievable,
/// without transferring the body.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchedResponse, FetchError>;

    async fn head(&self, url: &str) -> Result<(), FetchError>;
}

/// Fetcher backed by reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        // Bypass any intermediary HTTP cache; freshness decisions belong
        // to the sync layer, not to opportunistic caches along the way.
        let response = self
            .client
            .get(url)
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Http {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let body = response.bytes().await?.to_vec();

        Ok(FetchedResponse { body, content_type })
    }

    async fn head(&self, url: &str) -> Result<(), FetchError> {
        let response = self.client.head(url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(FetchError::Http {
                status: response.status().as_u16(),
                url: url.to_string(),
            })
        }
    }
}
