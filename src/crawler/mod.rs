//! Breadth-first product-page discovery
//!
//! One crawler instance serves one job. The frontier is FIFO, biased
//! within each discovered batch by product-keyword scoring; traversal
//! is bounded by depth, a product-page budget, and an overall visit
//! ceiling. A 403 from the site terminates the crawl immediately.

pub mod sitemap;

use crate::config::SiteConfig;
use crate::fetch::PageProvider;
use crate::page::{classify, extract_links, PageKind};
use crate::url::{is_excluded_path, keyword_score, same_domain};
use scraper::Html;
use std::cmp::Reverse;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use url::Url;

/// Safety multiple applied to max-pages for the overall visit ceiling
const VISIT_CEILING_FACTOR: u32 = 5;

/// Maximum links taken from a single page into the frontier
const MAX_LINKS_PER_PAGE: usize = 50;

/// Conventional catalog paths seeded at depth 1 alongside the base URL
const CATALOG_GUESSES: &[&str] = &[
    "/women",
    "/men",
    "/shop",
    "/products",
    "/new-arrivals",
    "/collections",
];

/// A pending frontier entry
#[derive(Debug, Clone)]
struct FrontierEntry {
    url: Url,
    depth: u32,
}

/// Result of one job's crawl phase
#[derive(Debug)]
pub struct CrawlOutcome {
    /// Product-page URLs in discovery order
    pub product_pages: Vec<Url>,

    /// Total URLs dequeued and fetched
    pub pages_visited: usize,

    /// True when the site answered 403 and the crawl was cut short
    pub forbidden: bool,
}

/// Frontier-driven crawler for a single site
pub struct Crawler {
    provider: Arc<dyn PageProvider>,
    site: SiteConfig,
    max_depth: u32,
}

impl Crawler {
    /// Creates a crawler over a page provider and resolved site config
    pub fn new(provider: Arc<dyn PageProvider>, site: SiteConfig, max_depth: u32) -> Self {
        Self {
            provider,
            site,
            max_depth,
        }
    }

    /// Discovers product pages starting from a site's base URL
    ///
    /// Transition per dequeued entry: skip if visited or over-depth;
    /// mark visited; fetch; on 403 stop the whole crawl; on any other
    /// failure skip the URL; on success classify. Product pages are
    /// terminal and emitted; listing and unknown pages are expanded
    /// with same-domain content links at depth + 1.
    ///
    /// Stops when the product budget is met or the visit ceiling
    /// (max-pages x 5) is reached, whichever comes first.
    pub async fn discover(&self, base_url: &Url) -> CrawlOutcome {
        let max_pages = self.site.max_pages as usize;
        let visit_ceiling = (self.site.max_pages * VISIT_CEILING_FACTOR) as usize;

        let mut frontier = self.seed_frontier(base_url);
        let mut visited: HashSet<String> = HashSet::new();
        let mut product_pages: Vec<Url> = Vec::new();
        let mut forbidden = false;

        while let Some(entry) = frontier.pop_front() {
            if product_pages.len() >= max_pages || visited.len() >= visit_ceiling {
                break;
            }

            if entry.depth > self.max_depth || visited.contains(entry.url.as_str()) {
                continue;
            }
            visited.insert(entry.url.to_string());

            let response = match self.provider.fetch(&entry.url).await {
                Ok(response) => response,
                Err(error) if error.is_hard_stop() => {
                    tracing::warn!("Site is blocking us at {}, stopping crawl", entry.url);
                    forbidden = true;
                    break;
                }
                Err(error) => {
                    tracing::debug!("Skipping {}: {}", entry.url, error);
                    continue;
                }
            };

            // Parse and analyze synchronously; Html is not Send and
            // must not live across an await
            let (kind, links) = {
                let body = response.text();
                let document = Html::parse_document(&body);
                let kind = classify(&document, &entry.url, &self.site);
                let links = if kind == PageKind::Product {
                    Vec::new()
                } else {
                    extract_links(&document, &entry.url)
                };
                (kind, links)
            };

            if kind == PageKind::Product {
                tracing::info!("Found product page: {}", entry.url);
                product_pages.push(entry.url);
                continue;
            }

            if entry.depth >= self.max_depth {
                continue;
            }

            for link in self.expand_links(links, base_url, &visited) {
                frontier.push_back(FrontierEntry {
                    url: link,
                    depth: entry.depth + 1,
                });
            }
        }

        tracing::info!(
            "Discovered {} product pages ({} pages visited)",
            product_pages.len(),
            visited.len()
        );

        CrawlOutcome {
            product_pages,
            pages_visited: visited.len(),
            forbidden,
        }
    }

    /// Seeds the frontier with the base URL plus catalog path guesses
    fn seed_frontier(&self, base_url: &Url) -> VecDeque<FrontierEntry> {
        let mut frontier = VecDeque::new();
        frontier.push_back(FrontierEntry {
            url: base_url.clone(),
            depth: 0,
        });

        for path in CATALOG_GUESSES {
            let guess = format!("{}{}", base_url.as_str().trim_end_matches('/'), path);
            if let Ok(url) = Url::parse(&guess) {
                frontier.push_back(FrontierEntry { url, depth: 1 });
            }
        }

        frontier
    }

    /// Filters, deduplicates, and priority-sorts links for enqueueing
    ///
    /// Same-domain content links only; product-keyword-rich URLs sort
    /// first within the batch (stable, so FIFO order is preserved
    /// among equals).
    fn expand_links(
        &self,
        links: Vec<Url>,
        base_url: &Url,
        visited: &HashSet<String>,
    ) -> Vec<Url> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut batch: Vec<Url> = links
            .into_iter()
            .filter(|link| same_domain(link, base_url))
            .filter(|link| !is_excluded_path(link))
            .filter(|link| !visited.contains(link.as_str()))
            .filter(|link| seen.insert(link.to_string()))
            .collect();

        batch.sort_by_key(|link| Reverse(keyword_score(link)));
        batch.truncate(MAX_LINKS_PER_PAGE);
        batch
    }
}
