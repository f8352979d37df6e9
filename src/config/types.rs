use serde::Deserialize;

/// Default product-detection threshold when a site does not override it
pub const DEFAULT_DETECTION_THRESHOLD: u32 = 3;

/// Main configuration structure for Lookbook
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub site: Vec<SiteEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum link depth to follow from a site's base URL
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of sites crawled concurrently
    #[serde(rename = "max-concurrent-jobs")]
    pub max_concurrent_jobs: u32,

    /// Maximum product pages to collect per site
    #[serde(rename = "max-pages-per-site")]
    pub max_pages_per_site: u32,

    /// Maximum images to download per site (absent = unlimited)
    #[serde(rename = "max-images-per-site", default)]
    pub max_images_per_site: Option<u32>,

    /// Default requests per second per domain
    #[serde(rename = "requests-per-second")]
    pub requests_per_second: f64,

    /// Maximum number of page responses held in the LRU cache
    #[serde(rename = "cache-capacity")]
    pub cache_capacity: usize,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the user-agent header string: `Name/Version (+url; email)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory where downloaded images are written
    #[serde(rename = "image-dir")]
    pub image_dir: String,

    /// Path to the CSV audit log of image sources
    #[serde(rename = "audit-path")]
    pub audit_path: String,

    /// Path to the persisted content-hash index
    #[serde(rename = "index-path")]
    pub index_path: String,
}

/// Page retrieval strategy for a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Plain HTTP retrieval of server-rendered HTML
    Html,
    /// Rendered-DOM retrieval via a controlled browser
    Browser,
}

/// Per-site configuration entry as written in the TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Domain this entry applies to (e.g. "www.example.com")
    pub domain: String,

    /// Page retrieval strategy (default: html)
    #[serde(default)]
    pub strategy: Option<Strategy>,

    /// Requests per second override for this domain
    #[serde(rename = "rate-limit", default)]
    pub rate_limit: Option<f64>,

    /// Product-page budget override for this site
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,

    /// Minimum indicator score for product-page detection
    #[serde(rename = "detection-threshold", default)]
    pub detection_threshold: Option<u32>,

    /// Extra CSS selectors that identify a product-detail container
    #[serde(rename = "product-selectors", default)]
    pub product_selectors: Vec<String>,

    /// Product sitemap URL; when set, frontier traversal is skipped
    /// and sitemap entries are trusted as product pages directly
    #[serde(rename = "sitemap-url", default)]
    pub sitemap_url: Option<String>,
}

/// Resolved per-site settings, with crawler-wide defaults applied
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub strategy: Strategy,
    pub rate_limit: f64,
    pub max_pages: u32,
    pub detection_threshold: u32,
    pub product_selectors: Vec<String>,
    pub sitemap_url: Option<String>,
}

impl Config {
    /// Resolves the effective configuration for a domain
    ///
    /// Lookup order: exact domain match, then the domain with the
    /// `www.` prefix stripped, then with the prefix added. Unmatched
    /// domains get crawler-wide defaults.
    pub fn site_config(&self, domain: &str) -> SiteConfig {
        let entry = self.find_entry(domain);

        SiteConfig {
            strategy: entry
                .and_then(|e| e.strategy)
                .unwrap_or(Strategy::Html),
            rate_limit: entry
                .and_then(|e| e.rate_limit)
                .unwrap_or(self.crawler.requests_per_second),
            max_pages: entry
                .and_then(|e| e.max_pages)
                .unwrap_or(self.crawler.max_pages_per_site),
            detection_threshold: entry
                .and_then(|e| e.detection_threshold)
                .unwrap_or(DEFAULT_DETECTION_THRESHOLD),
            product_selectors: entry
                .map(|e| e.product_selectors.clone())
                .unwrap_or_default(),
            sitemap_url: entry.and_then(|e| e.sitemap_url.clone()),
        }
    }

    fn find_entry(&self, domain: &str) -> Option<&SiteEntry> {
        let exact = self.site.iter().find(|e| e.domain == domain);
        if exact.is_some() {
            return exact;
        }

        if let Some(stripped) = domain.strip_prefix("www.") {
            let without = self.site.iter().find(|e| e.domain == stripped);
            if without.is_some() {
                return without;
            }
        }

        let with_www = format!("www.{}", domain);
        self.site.iter().find(|e| e.domain == with_www)
    }
}
