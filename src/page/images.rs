//! Image candidate extraction from product pages

use scraper::{Html, Selector};
use url::Url;

/// URL fragments that identify chrome and asset images, never products
const EXCLUDED_IMAGE_PATTERNS: &[&str] = &[
    "logo", "icon", "sprite", "button", "badge", "flag", "social", "payment",
];

/// Minimum declared dimension for a plausible product image
const MIN_DECLARED_DIMENSION: u32 = 100;

/// A candidate product image found on a page
///
/// Ephemeral: produced per product page and consumed immediately by
/// the download coordinator.
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    /// Absolute URL of the image resource
    pub url: Url,

    /// The product page the image was found on
    pub source_page: Url,
}

/// Extracts candidate product images from a parsed product page
///
/// Scans `img` tags (including `data-src`/`data-lazy` lazy-load
/// attributes), resolving relative URLs against the page URL. Images
/// with declared dimensions under 100px, data URIs, and URLs matching
/// chrome patterns (logos, icons, payment badges, ...) are rejected.
/// When nothing survives, falls back to the page's `og:image` or
/// `twitter:image` meta tags; JavaScript-rendered sites often expose
/// the hero image only there.
pub fn extract_image_candidates(document: &Html, page_url: &Url) -> Vec<ImageCandidate> {
    let mut candidates = Vec::new();

    if let Ok(selector) = Selector::parse("img") {
        for element in document.select(&selector) {
            let raw = element
                .value()
                .attr("src")
                .or_else(|| element.value().attr("data-src"))
                .or_else(|| element.value().attr("data-lazy"));

            let Some(raw) = raw else { continue };

            if raw.starts_with("data:") {
                continue;
            }

            let Ok(resolved) = page_url.join(raw) else {
                continue;
            };

            if declared_too_small(&element) {
                continue;
            }

            if matches_excluded_pattern(resolved.as_str()) {
                continue;
            }

            candidates.push(ImageCandidate {
                url: resolved,
                source_page: page_url.clone(),
            });
        }
    }

    if candidates.is_empty() {
        if let Some(fallback) = meta_image(document, page_url) {
            tracing::debug!("Using meta image fallback for {}", page_url);
            candidates.push(ImageCandidate {
                url: fallback,
                source_page: page_url.clone(),
            });
        }
    }

    candidates
}

fn declared_too_small(element: &scraper::ElementRef<'_>) -> bool {
    let width = element.value().attr("width").and_then(|w| w.parse::<u32>().ok());
    let height = element
        .value()
        .attr("height")
        .and_then(|h| h.parse::<u32>().ok());

    // Only reject when both dimensions are declared; many product
    // images omit them entirely
    match (width, height) {
        (Some(w), Some(h)) => w < MIN_DECLARED_DIMENSION || h < MIN_DECLARED_DIMENSION,
        _ => false,
    }
}

fn matches_excluded_pattern(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    EXCLUDED_IMAGE_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}

fn meta_image(document: &Html, page_url: &Url) -> Option<Url> {
    for selector_str in [
        r#"meta[property="og:image"]"#,
        r#"meta[name="twitter:image"]"#,
    ] {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(content) = document
                .select(&selector)
                .next()
                .and_then(|element| element.value().attr("content"))
            {
                if let Ok(resolved) = page_url.join(content) {
                    return Some(resolved);
                }
            }
        }
    }
    None
}
