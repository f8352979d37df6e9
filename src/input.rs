//! Seed-list ingestion
//!
//! Reads the `sites.csv` input file listing the sites to harvest.
//! Malformed rows are logged and skipped; only a missing file or a
//! missing header column is fatal.

use crate::{LookbookError, Result};
use std::path::Path;
use url::Url;

/// One site to crawl, as read from the input list
#[derive(Debug, Clone)]
pub struct SiteSeed {
    /// Human-readable site name, used in filenames and audit records
    pub name: String,

    /// Base URL the crawl starts from
    pub base_url: Url,
}

/// Reads the seed list from a CSV file
///
/// Expected columns: `site_name`, `base_url`. Rows with empty fields
/// or unparsable URLs are skipped with a warning.
pub fn read_site_list(path: &Path) -> Result<Vec<SiteSeed>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| LookbookError::Input(format!("failed to open {}: {}", path.display(), e)))?;

    let headers = reader.headers()?.clone();
    let name_idx = headers
        .iter()
        .position(|h| h == "site_name")
        .ok_or_else(|| LookbookError::Input("missing 'site_name' column".to_string()))?;
    let url_idx = headers
        .iter()
        .position(|h| h == "base_url")
        .ok_or_else(|| LookbookError::Input("missing 'base_url' column".to_string()))?;

    let mut seeds = Vec::new();

    for (row_num, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Skipping malformed row {}: {}", row_num + 2, e);
                continue;
            }
        };

        let name = record.get(name_idx).unwrap_or("").trim();
        let raw_url = record.get(url_idx).unwrap_or("").trim();

        if name.is_empty() || raw_url.is_empty() {
            tracing::warn!("Skipping row {}: missing site name or base URL", row_num + 2);
            continue;
        }

        let base_url = match Url::parse(raw_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => url,
            _ => {
                tracing::warn!("Skipping row {}: invalid base URL {}", row_num + 2, raw_url);
                continue;
            }
        };

        seeds.push(SiteSeed {
            name: name.to_string(),
            base_url,
        });
    }

    tracing::info!("Loaded {} sites from {}", seeds.len(), path.display());
    Ok(seeds)
}
