//! Configuration loading, types, and validation
//!
//! Lookbook is configured through a TOML file with crawler-wide
//! settings plus optional per-site overrides. Site entries are looked
//! up by domain, with and without the conventional `www.` prefix.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{
    Config, CrawlerConfig, OutputConfig, SiteConfig, SiteEntry, Strategy, UserAgentConfig,
};
pub use validation::validate;
