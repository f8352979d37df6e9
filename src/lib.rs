//! Lookbook: a polite product-image harvester
//!
//! This crate crawls commerce sites to discover product pages, extracts
//! candidate images from them, and downloads each distinct image exactly
//! once, respecting per-domain rate limits and per-site budgets across
//! many concurrent crawl jobs.

pub mod config;
pub mod crawler;
pub mod download;
pub mod fetch;
pub mod input;
pub mod page;
pub mod scheduler;
pub mod url;

use thiserror::Error;

/// Main error type for Lookbook operations
#[derive(Debug, Error)]
pub enum LookbookError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error for {url}: {source}")]
    Fetch {
        url: String,
        source: fetch::FetchError,
    },

    #[error("Input list error: {0}")]
    Input(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("Duplicate index error: {0}")]
    Index(String),

    #[error("Audit log error: {0}")]
    Audit(String),

    #[error("Job '{site}' failed: {message}")]
    JobFailed { site: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Lookbook operations
pub type Result<T> = std::result::Result<T, LookbookError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, SiteConfig};
pub use fetch::{BrowserProvider, FetchError, Fetcher, PageProvider};
pub use scheduler::{CrawlJob, JobScheduler, RunStats};
