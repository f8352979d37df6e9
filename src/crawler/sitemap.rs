//! Sitemap-driven product discovery
//!
//! When a site config names a sitemap URL, the frontier crawl is
//! skipped entirely: every `<loc>` entry is trusted as a product page
//! and handed straight to the download phase.

use crate::fetch::{FetchError, PageProvider};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Fetches a sitemap and returns its listed pages, up to `max_pages`
pub async fn fetch_sitemap_pages(
    provider: &dyn PageProvider,
    sitemap_url: &Url,
    max_pages: usize,
) -> Result<Vec<Url>, FetchError> {
    let response = provider.fetch(sitemap_url).await?;
    let pages = parse_sitemap(&response.text(), max_pages);
    tracing::info!("Sitemap {} listed {} pages", sitemap_url, pages.len());
    Ok(pages)
}

/// Parses sitemap XML, taking the first `<loc>` under each `<url>`
///
/// Only direct `<loc>` children count; `<image:loc>` and other
/// extension elements nested in the same entry are ignored. Entries
/// whose text does not parse as a URL are dropped.
pub fn parse_sitemap(xml: &str, max_pages: usize) -> Vec<Url> {
    let document = Html::parse_document(xml);

    let Ok(entry_selector) = Selector::parse("url") else {
        return Vec::new();
    };

    document
        .select(&entry_selector)
        .filter_map(|entry| first_loc_text(&entry))
        .filter_map(|loc| Url::parse(loc.trim()).ok())
        .take(max_pages)
        .collect()
}

fn first_loc_text(entry: &ElementRef<'_>) -> Option<String> {
    entry
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "loc")
        .map(|loc| loc.text().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
            <url>
                <loc>https://example.com/product/1</loc>
                <lastmod>2024-01-01</lastmod>
            </url>
            <url>
                <loc>https://example.com/product/2</loc>
            </url>
            <url>
                <loc>https://example.com/product/3</loc>
            </url>
        </urlset>"#;

    #[test]
    fn test_parse_basic_sitemap() {
        let pages = parse_sitemap(SITEMAP, 100);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].as_str(), "https://example.com/product/1");
        assert_eq!(pages[2].as_str(), "https://example.com/product/3");
    }

    #[test]
    fn test_truncates_to_max_pages() {
        let pages = parse_sitemap(SITEMAP, 2);
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn test_ignores_image_extension_loc() {
        let xml = r#"<urlset>
            <url>
                <image:image><image:loc>https://cdn.example.com/a.jpg</image:loc></image:image>
                <loc>https://example.com/product/1</loc>
            </url>
        </urlset>"#;
        let pages = parse_sitemap(xml, 100);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].as_str(), "https://example.com/product/1");
    }

    #[test]
    fn test_unparsable_entries_dropped() {
        let xml = r#"<urlset>
            <url><loc>not a url</loc></url>
            <url><loc>https://example.com/ok</loc></url>
        </urlset>"#;
        let pages = parse_sitemap(xml, 100);
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_empty_sitemap() {
        assert!(parse_sitemap("<urlset></urlset>", 100).is_empty());
    }
}
