//! Link extraction for frontier expansion

use crate::url::resolve_link;
use scraper::{Html, Selector};
use url::Url;

/// Extracts all followable links from a parsed document
///
/// Relative hrefs are resolved against `base_url`; `javascript:`,
/// `mailto:`, `tel:`, data URIs, fragment anchors, and download links
/// are dropped. Domain and non-content filtering happens in the
/// crawler, not here.
pub fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute) = resolve_link(href, base_url) {
                    links.push(absolute);
                }
            }
        }
    }

    links
}
