//! Rendered-DOM page retrieval via headless Chromium
//!
//! The alternate [`PageProvider`] for sites whose product markup only
//! exists after JavaScript runs. One Chromium process serves the whole
//! run; each fetch opens a tab, waits for the body to render, reads
//! the DOM, and closes the tab. The same per-domain rate limits and
//! response cache apply as for plain HTTP retrieval.

use crate::fetch::{FetchError, FetchedResponse, PageProvider, RateLimiter, ResponseCache};
use crate::url::extract_domain;
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Rendered-DOM fetcher backed by a shared headless Chromium
pub struct BrowserProvider {
    browser: Arc<Browser>,
    timeout: Duration,
    rate_limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
}

impl BrowserProvider {
    /// Launches headless Chromium with a 30 s navigation timeout
    ///
    /// Requires a Chromium / Chrome binary reachable via `$PATH`, a
    /// well-known install location, or the `CHROME_BIN` environment
    /// variable.
    pub async fn launch(
        rate_limiter: Arc<RateLimiter>,
        cache: Arc<ResponseCache>,
    ) -> Result<Self, FetchError> {
        Self::launch_with_timeout(rate_limiter, cache, Duration::from_secs(30)).await
    }

    /// Launches headless Chromium with a custom navigation timeout
    pub async fn launch_with_timeout(
        rate_limiter: Arc<RateLimiter>,
        cache: Arc<ResponseCache>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let mut builder = BrowserConfig::builder();
        builder = builder.no_sandbox().disable_default_args();

        if let Some(binary) = find_chrome_binary() {
            tracing::info!("Using Chrome binary: {}", binary.display());
            builder = builder.chrome_executable(binary);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--no-first-run")
            .build()
            .map_err(|e| FetchError::Browser(format!("browser config error: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Browser(format!("failed to launch browser: {}", e)))?;

        // The CDP handler must be polled continuously for the
        // connection to stay alive
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {:?}", event);
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            timeout,
            rate_limiter,
            cache,
        })
    }

    async fn render(&self, url: &Url) -> Result<String, FetchError> {
        let page = self
            .browser
            .new_page(url.as_str())
            .await
            .map_err(|e| FetchError::Browser(format!("failed to navigate to {}: {}", url, e)))?;

        // Body presence is the minimal signal that the main content
        // has rendered
        page.find_element("body")
            .await
            .map_err(|e| FetchError::Browser(format!("page did not render body: {}", e)))?;

        let html = page
            .content()
            .await
            .map_err(|e| FetchError::Browser(format!("failed to read page content: {}", e)))?;

        // Close the tab to free browser resources
        let _ = page.close().await;

        Ok(html)
    }
}

#[async_trait]
impl PageProvider for BrowserProvider {
    async fn fetch(&self, url: &Url) -> Result<FetchedResponse, FetchError> {
        if let Some(hit) = self.cache.get(url.as_str()) {
            tracing::trace!("Cache hit: {}", url);
            return Ok(hit);
        }

        let domain = extract_domain(url).unwrap_or_default();
        self.rate_limiter.acquire(&domain).await;

        let html = match tokio::time::timeout(self.timeout, self.render(url)).await {
            Ok(rendered) => rendered?,
            Err(_) => return Err(FetchError::Transient("render timeout".to_string())),
        };

        let fetched = FetchedResponse {
            bytes: html.into_bytes(),
            content_type: Some("text/html".to_string()),
            final_url: url.to_string(),
        };
        self.cache.put(url.as_str(), fetched.clone());

        Ok(fetched)
    }
}

/// Tries to locate the real Chrome/Chromium binary
///
/// Snap-packaged Chromium exposes a wrapper that rejects standard
/// Chrome CLI flags, so the real binary inside the snap is preferred;
/// `None` lets chromiumoxide do its own lookup.
fn find_chrome_binary() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&explicit);
        if path.exists() {
            return Some(path);
        }
    }

    let candidates: &[&str] = &[
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ];

    candidates.iter().map(PathBuf::from).find(|p| p.exists())
}
