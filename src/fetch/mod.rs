//! Page and resource retrieval
//!
//! This module composes the per-domain rate limiter and the bounded
//! response cache behind a pooled HTTP client, and classifies
//! transport and HTTP failures into the taxonomy the crawler acts on.
//! The fetcher itself never retries; retry policy belongs to callers,
//! and this system deliberately performs none.

pub mod browser;
mod cache;
mod rate_limit;

pub use browser::BrowserProvider;
pub use cache::ResponseCache;
pub use rate_limit::RateLimiter;

use crate::config::UserAgentConfig;
use crate::url::extract_domain;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Classified fetch failure
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level timeout or connection error
    #[error("transient network error: {0}")]
    Transient(String),

    /// HTTP 404
    #[error("not found")]
    NotFound,

    /// HTTP 403; the site is blocking us. Callers must treat this as a
    /// hard stop for the enclosing job.
    #[error("forbidden")]
    Forbidden,

    /// Any other non-2xx status
    #[error("http status {0}")]
    Http(u16),

    /// Malformed or unusable content
    #[error("parse error: {0}")]
    Parse(String),

    /// Headless browser launch or rendering failure
    #[error("browser error: {0}")]
    Browser(String),
}

impl FetchError {
    /// Returns true when this failure must abort the enclosing job
    pub fn is_hard_stop(&self) -> bool {
        matches!(self, FetchError::Forbidden)
    }
}

/// A successfully fetched response
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// Raw response body
    pub bytes: Vec<u8>,

    /// Content-Type header value, if present
    pub content_type: Option<String>,

    /// Final URL after redirects
    pub final_url: String,
}

impl FetchedResponse {
    /// Interprets the body as UTF-8 text, lossily
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Interface for page source retrieval
///
/// The HTTP [`Fetcher`] is the default implementation;
/// [`BrowserProvider`] is the rendered-DOM alternative, selected per
/// site by configuration.
#[async_trait]
pub trait PageProvider: Send + Sync {
    /// Fetches a page, going through the response cache
    async fn fetch(&self, url: &Url) -> Result<FetchedResponse, FetchError>;

    /// Fetches a resource without touching the cache
    ///
    /// Used for image bytes, which are fetched at most once by
    /// construction and would only hold cache memory.
    async fn fetch_uncached(&self, url: &Url) -> Result<FetchedResponse, FetchError> {
        self.fetch(url).await
    }
}

/// Builds the pooled HTTP client used for all network retrieval
///
/// Connect, read, and total timeouts are independent; redirects are
/// followed by reqwest's default policy.
pub fn build_http_client(user_agent: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Rate-limited, cache-aware page and resource fetcher
pub struct Fetcher {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
}

impl Fetcher {
    /// Creates a fetcher over a shared rate limiter and cache
    pub fn new(client: Client, rate_limiter: Arc<RateLimiter>, cache: Arc<ResponseCache>) -> Self {
        Self {
            client,
            rate_limiter,
            cache,
        }
    }

    /// Fetches a URL
    ///
    /// With `use_cache`, a cache hit returns immediately without rate
    /// limiting. Otherwise the caller waits on the domain's rate slot,
    /// the request goes out over the pooled client, and a successful
    /// response is stored back into the cache.
    ///
    /// Image-byte fetches pass `use_cache = false`; each image URL is
    /// fetched at most once by construction, so caching them would only
    /// hold memory.
    pub async fn get(&self, url: &Url, use_cache: bool) -> Result<FetchedResponse, FetchError> {
        if use_cache {
            if let Some(hit) = self.cache.get(url.as_str()) {
                tracing::trace!("Cache hit: {}", url);
                return Ok(hit);
            }
        }

        let domain = extract_domain(url).unwrap_or_default();
        self.rate_limiter.acquire(&domain).await;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        match status.as_u16() {
            404 => return Err(FetchError::NotFound),
            403 => return Err(FetchError::Forbidden),
            code if !status.is_success() => return Err(FetchError::Http(code)),
            _ => {}
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(classify_transport)?
            .to_vec();

        let fetched = FetchedResponse {
            bytes,
            content_type,
            final_url,
        };

        if use_cache {
            self.cache.put(url.as_str(), fetched.clone());
        }

        Ok(fetched)
    }
}

#[async_trait]
impl PageProvider for Fetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedResponse, FetchError> {
        self.get(url, true).await
    }

    async fn fetch_uncached(&self, url: &Url) -> Result<FetchedResponse, FetchError> {
        self.get(url, false).await
    }
}

fn classify_transport(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Transient("request timeout".to_string())
    } else if error.is_connect() {
        FetchError::Transient("connection error".to_string())
    } else {
        FetchError::Transient(error.to_string())
    }
}
