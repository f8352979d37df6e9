//! Concurrent job scheduling
//!
//! One crawl job per seed site. Jobs run concurrently under a
//! semaphore bound, share the fetcher, duplicate index, and audit log,
//! and are isolated from each other: a job that fails or is blocked
//! leaves its siblings running and its partial results on disk.

use crate::config::{Config, SiteConfig, Strategy};
use crate::crawler::{sitemap, Crawler};
use crate::download::{AuditLog, ContentFilter, DownloadCoordinator, DuplicateIndex};
use crate::fetch::{
    build_http_client, BrowserProvider, Fetcher, PageProvider, RateLimiter, ResponseCache,
};
use crate::input::SiteSeed;
use crate::page::{extract_image_candidates, ImageCandidate};
use crate::url::extract_domain;
use crate::{LookbookError, Result};
use scraper::Html;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// One site to harvest, paired with its resolved configuration
#[derive(Debug, Clone)]
pub struct CrawlJob {
    pub seed: SiteSeed,
    pub site: SiteConfig,
}

/// Aggregate statistics for a whole run
#[derive(Debug, Default, Clone, Copy)]
pub struct RunStats {
    pub sites_attempted: u32,
    pub sites_completed: u32,
    pub sites_failed: u32,
    /// Jobs cut short by a blocking site
    pub sites_blocked: u32,
    pub pages_visited: u64,
    pub product_pages: u64,
    pub images_saved: u64,
    pub duplicates_skipped: u64,
    pub images_filtered: u64,
    pub download_failures: u64,
}

/// Runs crawl jobs concurrently over shared infrastructure
pub struct JobScheduler {
    config: Config,
    provider: Arc<dyn PageProvider>,
    browser_provider: Option<Arc<dyn PageProvider>>,
    rate_limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    index: Arc<DuplicateIndex>,
    audit: Arc<AuditLog>,
    filter: Option<Arc<dyn ContentFilter>>,
}

impl JobScheduler {
    /// Builds the shared infrastructure from a validated config
    ///
    /// Creates the output image directory if needed and loads the
    /// persisted duplicate index, so a rerun skips images harvested by
    /// earlier runs.
    pub fn new(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.output.image_dir)?;

        let client = build_http_client(&config.user_agent)?;
        let rate_limiter = Arc::new(RateLimiter::new(config.crawler.requests_per_second));
        let cache = Arc::new(ResponseCache::new(config.crawler.cache_capacity));
        let provider: Arc<dyn PageProvider> =
            Arc::new(Fetcher::new(client, Arc::clone(&rate_limiter), Arc::clone(&cache)));

        let index = Arc::new(DuplicateIndex::open(Path::new(&config.output.index_path))?);
        let audit = Arc::new(AuditLog::open(Path::new(&config.output.audit_path))?);

        Ok(Self {
            config,
            provider,
            browser_provider: None,
            rate_limiter,
            cache,
            index,
            audit,
            filter: None,
        })
    }

    /// Installs a post-download content filter for all jobs
    pub fn with_filter(mut self, filter: Arc<dyn ContentFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Installs a rendered-DOM provider for browser-strategy sites
    ///
    /// Without one, the scheduler launches its own headless browser
    /// lazily when a run contains a browser-strategy site.
    pub fn with_browser_provider(mut self, provider: Arc<dyn PageProvider>) -> Self {
        self.browser_provider = Some(provider);
        self
    }

    /// Runs all jobs to completion and returns aggregate statistics
    pub async fn run(&self, jobs: Vec<CrawlJob>) -> RunStats {
        let semaphore = Arc::new(Semaphore::new(
            self.config.crawler.max_concurrent_jobs as usize,
        ));
        let stats = Arc::new(Mutex::new(RunStats {
            sites_attempted: jobs.len() as u32,
            ..RunStats::default()
        }));

        let browser = self.resolve_browser_provider(&jobs).await;

        let mut set = JoinSet::new();
        for job in jobs {
            let semaphore = Arc::clone(&semaphore);
            let stats = Arc::clone(&stats);
            let runner = self.job_runner(&job, browser.as_ref());

            set.spawn(async move {
                // Closed semaphore cannot happen; treat it as a skip
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };

                let site_name = job.seed.name.clone();
                match runner.run(job).await {
                    Ok(outcome) => {
                        tracing::info!(
                            "Job '{}' done: {} products, {} images saved",
                            site_name,
                            outcome.product_pages,
                            outcome.images_saved
                        );
                        if let Ok(mut stats) = stats.lock() {
                            stats.sites_completed += 1;
                            if outcome.blocked {
                                stats.sites_blocked += 1;
                            }
                            stats.pages_visited += outcome.pages_visited;
                            stats.product_pages += outcome.product_pages;
                            stats.images_saved += outcome.images_saved;
                            stats.duplicates_skipped += outcome.duplicates_skipped;
                            stats.images_filtered += outcome.images_filtered;
                            stats.download_failures += outcome.download_failures;
                        }
                    }
                    Err(error) => {
                        tracing::error!("Job '{}' failed: {}", site_name, error);
                        if let Ok(mut stats) = stats.lock() {
                            stats.sites_failed += 1;
                        }
                    }
                }
            });
        }

        while let Some(joined) = set.join_next().await {
            // A join error means the task itself panicked; the site it
            // carried produced nothing and must show up as failed
            if let Err(error) = joined {
                tracing::error!("Crawl task panicked: {}", error);
                if let Ok(mut stats) = stats.lock() {
                    stats.sites_failed += 1;
                }
            }
        }

        let stats = stats.lock().map(|s| *s).unwrap_or_default();
        tracing::info!(
            "Run complete: {}/{} sites, {} product pages, {} images saved ({} duplicates skipped)",
            stats.sites_completed,
            stats.sites_attempted,
            stats.product_pages,
            stats.images_saved,
            stats.duplicates_skipped
        );
        stats
    }

    /// Returns the rendered-DOM provider when any job needs one
    ///
    /// Nothing is launched for runs without a browser-strategy site.
    /// When a launch is needed and fails, those sites fall back to
    /// plain HTTP with a warning; many render-heavy sites still expose
    /// meta-tag images.
    async fn resolve_browser_provider(&self, jobs: &[CrawlJob]) -> Option<Arc<dyn PageProvider>> {
        if !jobs.iter().any(|job| job.site.strategy == Strategy::Browser) {
            return None;
        }

        if let Some(injected) = &self.browser_provider {
            return Some(Arc::clone(injected));
        }

        match BrowserProvider::launch(Arc::clone(&self.rate_limiter), Arc::clone(&self.cache)).await
        {
            Ok(provider) => Some(Arc::new(provider)),
            Err(error) => {
                tracing::warn!(
                    "Browser launch failed, browser-strategy sites fall back to plain HTTP: {}",
                    error
                );
                None
            }
        }
    }

    fn job_runner(&self, job: &CrawlJob, browser: Option<&Arc<dyn PageProvider>>) -> JobRunner {
        if let Some(domain) = extract_domain(&job.seed.base_url) {
            self.rate_limiter.set_domain_rate(&domain, job.site.rate_limit);
        }

        let page_provider = match (job.site.strategy, browser) {
            (Strategy::Browser, Some(browser)) => Arc::clone(browser),
            _ => Arc::clone(&self.provider),
        };

        JobRunner {
            page_provider,
            // Image bytes are static resources; they always go over
            // plain HTTP, whatever rendered the page
            image_provider: Arc::clone(&self.provider),
            index: Arc::clone(&self.index),
            audit: Arc::clone(&self.audit),
            filter: self.filter.clone(),
            image_dir: PathBuf::from(&self.config.output.image_dir),
            max_depth: self.config.crawler.max_depth,
            image_budget: self.config.crawler.max_images_per_site,
        }
    }
}

/// Per-job outcome rolled into [`RunStats`]
#[derive(Debug, Default)]
struct JobOutcome {
    blocked: bool,
    pages_visited: u64,
    product_pages: u64,
    images_saved: u64,
    duplicates_skipped: u64,
    images_filtered: u64,
    download_failures: u64,
}

/// Owns everything one spawned job task needs
struct JobRunner {
    /// Retrieves page sources, per the site's strategy
    page_provider: Arc<dyn PageProvider>,
    /// Retrieves image bytes, always over plain HTTP
    image_provider: Arc<dyn PageProvider>,
    index: Arc<DuplicateIndex>,
    audit: Arc<AuditLog>,
    filter: Option<Arc<dyn ContentFilter>>,
    image_dir: PathBuf,
    max_depth: u32,
    image_budget: Option<u32>,
}

impl JobRunner {
    async fn run(self, job: CrawlJob) -> Result<JobOutcome> {
        let site = job.site.clone();

        let (product_pages, pages_visited, blocked) = match site.sitemap_url.clone() {
            Some(raw_sitemap_url) => {
                let sitemap_url = Url::parse(&raw_sitemap_url)?;
                let pages = sitemap::fetch_sitemap_pages(
                    self.page_provider.as_ref(),
                    &sitemap_url,
                    site.max_pages as usize,
                )
                .await
                .map_err(|source| LookbookError::Fetch {
                    url: sitemap_url.to_string(),
                    source,
                })?;
                let count = pages.len();
                (pages, count, false)
            }
            None => {
                let crawler = Crawler::new(Arc::clone(&self.page_provider), site, self.max_depth);
                let outcome = crawler.discover(&job.seed.base_url).await;
                (
                    outcome.product_pages,
                    outcome.pages_visited,
                    outcome.forbidden,
                )
            }
        };

        let candidates = self.collect_candidates(&product_pages).await;
        tracing::info!(
            "'{}': {} image candidates across {} product pages",
            job.seed.name,
            candidates.len(),
            product_pages.len()
        );

        let coordinator = Arc::new(DownloadCoordinator::new(
            Arc::clone(&self.image_provider),
            Arc::clone(&self.index),
            Arc::clone(&self.audit),
            self.filter.clone(),
            self.image_dir.clone(),
            job.seed.name.clone(),
            self.image_budget,
        ));
        let tally = coordinator.harvest(candidates).await;

        Ok(JobOutcome {
            blocked,
            pages_visited: pages_visited as u64,
            product_pages: product_pages.len() as u64,
            images_saved: tally.saved as u64,
            duplicates_skipped: tally.duplicates as u64,
            images_filtered: tally.filtered as u64,
            download_failures: tally.failed as u64,
        })
    }

    /// Fetches each product page and extracts its image candidates
    ///
    /// Product pages were fetched during discovery and come back out
    /// of the response cache here. Candidate URLs are deduplicated
    /// within the job so no image URL is fetched twice.
    async fn collect_candidates(&self, product_pages: &[Url]) -> Vec<ImageCandidate> {
        let mut candidates = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for page_url in product_pages {
            let response = match self.page_provider.fetch(page_url).await {
                Ok(response) => response,
                Err(error) => {
                    tracing::debug!("Skipping product page {}: {}", page_url, error);
                    continue;
                }
            };

            // Html is not Send; parse and extract before the next await
            let extracted = {
                let body = response.text();
                let document = Html::parse_document(&body);
                extract_image_candidates(&document, page_url)
            };

            for candidate in extracted {
                if seen.insert(candidate.url.to_string()) {
                    candidates.push(candidate);
                }
            }
        }

        candidates
    }
}
