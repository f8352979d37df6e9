//! URL helpers shared across the crawler and fetch layers
//!
//! Domain extraction, link resolution, non-content path filtering, and
//! the keyword scoring used to bias frontier ordering.

use url::Url;

/// Path fragments that identify non-content pages we never crawl
/// (auth, checkout, legal, and support pages).
const EXCLUDED_PATH_FRAGMENTS: &[&str] = &[
    "login",
    "signup",
    "account",
    "cart",
    "checkout",
    "privacy",
    "terms",
    "contact",
    "about",
    "stores",
    "customer-service",
    "help",
];

/// Keywords that suggest a URL leads toward product content.
const PRODUCT_KEYWORDS: &[&str] = &[
    "product",
    "collection",
    "shop",
    "women",
    "men",
    "bags",
    "shoes",
    "clothing",
];

/// Extracts the host (domain) portion of a URL
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_ascii_lowercase())
}

/// Strips a leading `www.` prefix from a domain, if present
pub fn strip_www(domain: &str) -> &str {
    domain.strip_prefix("www.").unwrap_or(domain)
}

/// Returns true when two URLs share the same host
pub fn same_domain(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(ha), Some(hb)) => ha.eq_ignore_ascii_case(hb),
        _ => false,
    }
}

/// Resolves a link href against a base URL and validates it
///
/// Returns `None` for links that should never enter the frontier:
/// `javascript:`, `mailto:`, `tel:` and data URIs, fragment-only
/// anchors, and anything that does not resolve to HTTP(S).
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    if href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute)
        }
        _ => None,
    }
}

/// Checks whether a URL points at a non-content page
///
/// The crawler skips these entirely; they never produce product pages
/// and inflate the visit budget for nothing.
pub fn is_excluded_path(url: &Url) -> bool {
    let lower = url.as_str().to_ascii_lowercase();
    EXCLUDED_PATH_FRAGMENTS
        .iter()
        .any(|fragment| lower.contains(fragment))
}

/// Scores a URL by the number of product-related keywords it contains
///
/// Higher scores are enqueued earlier within a discovered batch so that
/// catalog and product paths are explored before editorial pages.
pub fn keyword_score(url: &Url) -> usize {
    let lower = url.as_str().to_ascii_lowercase();
    PRODUCT_KEYWORDS
        .iter()
        .filter(|kw| lower.contains(*kw))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/catalog").unwrap()
    }

    #[test]
    fn test_extract_domain() {
        let url = Url::parse("https://WWW.Example.com/page").unwrap();
        assert_eq!(extract_domain(&url), Some("www.example.com".to_string()));
    }

    #[test]
    fn test_strip_www() {
        assert_eq!(strip_www("www.example.com"), "example.com");
        assert_eq!(strip_www("example.com"), "example.com");
        assert_eq!(strip_www("shop.example.com"), "shop.example.com");
    }

    #[test]
    fn test_same_domain() {
        let a = Url::parse("https://example.com/a").unwrap();
        let b = Url::parse("https://example.com/b").unwrap();
        let c = Url::parse("https://other.com/c").unwrap();
        assert!(same_domain(&a, &b));
        assert!(!same_domain(&a, &c));
    }

    #[test]
    fn test_resolve_relative_link() {
        let resolved = resolve_link("/dress", &base()).unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/dress");
    }

    #[test]
    fn test_resolve_absolute_link() {
        let resolved = resolve_link("https://example.com/shoes", &base()).unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/shoes");
    }

    #[test]
    fn test_skip_special_schemes() {
        assert!(resolve_link("javascript:void(0)", &base()).is_none());
        assert!(resolve_link("mailto:a@b.com", &base()).is_none());
        assert!(resolve_link("tel:+1234", &base()).is_none());
        assert!(resolve_link("data:text/html,x", &base()).is_none());
        assert!(resolve_link("#anchor", &base()).is_none());
        assert!(resolve_link("", &base()).is_none());
    }

    #[test]
    fn test_excluded_paths() {
        let cart = Url::parse("https://example.com/cart").unwrap();
        let legal = Url::parse("https://example.com/legal/privacy").unwrap();
        let product = Url::parse("https://example.com/product/123").unwrap();
        assert!(is_excluded_path(&cart));
        assert!(is_excluded_path(&legal));
        assert!(!is_excluded_path(&product));
    }

    #[test]
    fn test_keyword_score_ordering() {
        let product = Url::parse("https://example.com/shop/women/shoes").unwrap();
        let editorial = Url::parse("https://example.com/journal/spring").unwrap();
        assert!(keyword_score(&product) > keyword_score(&editorial));
        assert_eq!(keyword_score(&editorial), 0);
    }
}
