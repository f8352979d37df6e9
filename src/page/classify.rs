//! Product-page vs. listing-page classification
//!
//! Two independently weighted indicator sets are evaluated against the
//! parsed page: product-detail indicators score toward a per-site
//! detection threshold, while any single listing indicator marks the
//! page as a listing candidate.
//!
//! Tie-break, in order:
//! 1. listing fired and product did not -> `Listing` (crawl deeper)
//! 2. product fired -> `Product` (terminal; product outranks listing)
//! 3. otherwise -> `Unknown` (non-terminal, no special priority)
//!
//! Ambiguous pages are deliberately not marked as products: a false
//! negative costs one missed product, a false positive pollutes the
//! output with whole category pages.

use crate::config::SiteConfig;
use scraper::{Html, Selector};
use url::Url;

/// Classification outcome for a fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Terminal product-detail page; emit, do not descend
    Product,
    /// Listing/category page; expand its links
    Listing,
    /// Neither set fired conclusively; expanded like a listing
    Unknown,
}

/// URL endings that mark a pure category segment
const CATEGORY_ENDINGS: &[&str] = &[
    "/women",
    "/men",
    "/shop",
    "/bags",
    "/shoes",
    "/clothing",
    "/accessories",
    "/collections",
    "/products",
    "/new-arrivals",
];

/// Phrases on purchase-action controls
const PURCHASE_PHRASES: &[&str] = &["add to cart", "add to bag", "buy now"];

/// A scored product-detail indicator
struct Indicator {
    name: &'static str,
    weight: u32,
}

const PURCHASE_CONTROL: Indicator = Indicator {
    name: "purchase-action control",
    weight: 3,
};
const STRUCTURED_MARKUP: Indicator = Indicator {
    name: "structured product markup",
    weight: 3,
};
const DETAIL_CONTAINER: Indicator = Indicator {
    name: "product-detail container",
    weight: 2,
};
const PRODUCT_URL_PATH: Indicator = Indicator {
    name: "product URL path",
    weight: 2,
};

/// Classifies a parsed page against a site's configuration
///
/// Pure function of (document, URL, site config); safe to call from
/// any context.
pub fn classify(document: &Html, url: &Url, site: &SiteConfig) -> PageKind {
    let product_fired = product_score(document, url, site) >= site.detection_threshold;
    let listing_fired = listing_indicators_fire(document, url);

    if listing_fired && !product_fired {
        return PageKind::Listing;
    }
    if product_fired {
        return PageKind::Product;
    }
    PageKind::Unknown
}

fn product_score(document: &Html, url: &Url, site: &SiteConfig) -> u32 {
    let mut score = 0;

    if has_purchase_control(document) {
        tracing::trace!("{} fired for {}", PURCHASE_CONTROL.name, url);
        score += PURCHASE_CONTROL.weight;
    }

    if has_structured_markup(document) {
        tracing::trace!("{} fired for {}", STRUCTURED_MARKUP.name, url);
        score += STRUCTURED_MARKUP.weight;
    }

    if has_detail_container(document, site) {
        tracing::trace!("{} fired for {}", DETAIL_CONTAINER.name, url);
        score += DETAIL_CONTAINER.weight;
    }

    if has_product_path(url) {
        tracing::trace!("{} fired for {}", PRODUCT_URL_PATH.name, url);
        score += PRODUCT_URL_PATH.weight;
    }

    score
}

fn has_purchase_control(document: &Html) -> bool {
    let Ok(selector) = Selector::parse("button, [role='button'], input[type='submit']") else {
        return false;
    };

    document.select(&selector).any(|element| {
        let text = element.text().collect::<String>().to_ascii_lowercase();
        let value = element
            .value()
            .attr("value")
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();
        PURCHASE_PHRASES
            .iter()
            .any(|phrase| text.contains(phrase) || value.contains(phrase))
    })
}

fn has_structured_markup(document: &Html) -> bool {
    if let Ok(selector) = Selector::parse(r#"[itemtype*="Product"]"#) {
        if document.select(&selector).next().is_some() {
            return true;
        }
    }

    if let Ok(selector) = Selector::parse(r#"meta[property="og:type"][content="product"]"#) {
        if document.select(&selector).next().is_some() {
            return true;
        }
    }

    false
}

fn has_detail_container(document: &Html, site: &SiteConfig) -> bool {
    if let Ok(selector) =
        Selector::parse(r#".product-details, #product-detail, [class*="product-detail"]"#)
    {
        if document.select(&selector).next().is_some() {
            return true;
        }
    }

    // Site-config selectors extend, never replace, the built-in set
    site.product_selectors.iter().any(|raw| {
        Selector::parse(raw)
            .map(|selector| document.select(&selector).next().is_some())
            .unwrap_or(false)
    })
}

fn has_product_path(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    let looks_like_product =
        path.contains("/product/") || path.contains("/p/") || path.contains("/item/");
    looks_like_product && !ends_in_category_segment(&path)
}

fn listing_indicators_fire(document: &Html, url: &Url) -> bool {
    if ends_in_category_segment(&url.path().to_ascii_lowercase()) {
        return true;
    }

    if let Ok(selector) = Selector::parse(
        r#".product-tile, .product-card, .product-item, [class*="product-tile"], [class*="product-card"]"#,
    ) {
        if document.select(&selector).count() >= 3 {
            return true;
        }
    }

    if let Ok(selector) =
        Selector::parse(r#".product-grid, .product-list, [class*="product-grid"]"#)
    {
        if document.select(&selector).next().is_some() {
            return true;
        }
    }

    if let Ok(selector) =
        Selector::parse(r#"a[href*="/product/"], a[href*="/p/"], a[href*="/item/"]"#)
    {
        if document.select(&selector).count() >= 3 {
            return true;
        }
    }

    false
}

fn ends_in_category_segment(path: &str) -> bool {
    let trimmed = path.trim_end_matches('/');
    CATEGORY_ENDINGS
        .iter()
        .any(|ending| trimmed.ends_with(ending))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Strategy;

    fn site() -> SiteConfig {
        SiteConfig {
            strategy: Strategy::Html,
            rate_limit: 2.0,
            max_pages: 20,
            detection_threshold: 3,
            product_selectors: vec![],
            sitemap_url: None,
        }
    }

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://example.com{}", path)).unwrap()
    }

    #[test]
    fn test_purchase_button_marks_product() {
        let html = r#"<html><body>
            <h1>Silk Dress</h1>
            <button>Add to Cart</button>
        </body></html>"#;
        let doc = Html::parse_document(html);
        assert_eq!(classify(&doc, &url("/silk-dress"), &site()), PageKind::Product);
    }

    #[test]
    fn test_structured_markup_marks_product() {
        let html = r#"<html><head>
            <meta property="og:type" content="product">
        </head><body></body></html>"#;
        let doc = Html::parse_document(html);
        assert_eq!(classify(&doc, &url("/x"), &site()), PageKind::Product);
    }

    #[test]
    fn test_url_path_alone_is_below_threshold() {
        // Path pattern carries weight 2 against the default threshold 3
        let doc = Html::parse_document("<html><body></body></html>");
        assert_eq!(
            classify(&doc, &url("/product/123"), &site()),
            PageKind::Unknown
        );
    }

    #[test]
    fn test_path_plus_container_reaches_threshold() {
        let html = r#"<html><body><div class="product-details">...</div></body></html>"#;
        let doc = Html::parse_document(html);
        assert_eq!(
            classify(&doc, &url("/product/123"), &site()),
            PageKind::Product
        );
    }

    #[test]
    fn test_listing_by_category_url() {
        let doc = Html::parse_document("<html><body></body></html>");
        assert_eq!(classify(&doc, &url("/women"), &site()), PageKind::Listing);
        assert_eq!(classify(&doc, &url("/shop/"), &site()), PageKind::Listing);
    }

    #[test]
    fn test_listing_by_repeated_tiles() {
        let html = r#"<html><body>
            <div class="product-card">A</div>
            <div class="product-card">B</div>
            <div class="product-card">C</div>
        </body></html>"#;
        let doc = Html::parse_document(html);
        assert_eq!(classify(&doc, &url("/arrivals"), &site()), PageKind::Listing);
    }

    #[test]
    fn test_listing_by_product_links() {
        let html = r#"<html><body>
            <a href="/product/1">1</a>
            <a href="/product/2">2</a>
            <a href="/product/3">3</a>
        </body></html>"#;
        let doc = Html::parse_document(html);
        assert_eq!(classify(&doc, &url("/sale"), &site()), PageKind::Listing);
    }

    #[test]
    fn test_product_outranks_listing() {
        // A detail page that also shows a "related items" grid
        let html = r#"<html><body>
            <button>Add to Bag</button>
            <div class="product-details">...</div>
            <div class="product-card">r1</div>
            <div class="product-card">r2</div>
            <div class="product-card">r3</div>
        </body></html>"#;
        let doc = Html::parse_document(html);
        assert_eq!(
            classify(&doc, &url("/product/42"), &site()),
            PageKind::Product
        );
    }

    #[test]
    fn test_category_ending_defeats_product_path() {
        let doc = Html::parse_document("<html><body></body></html>");
        // "/products" is a category ending even though it contains no
        // other signal; must not score as a product path
        assert_ne!(
            classify(&doc, &url("/products"), &site()),
            PageKind::Product
        );
    }

    #[test]
    fn test_plain_page_is_unknown() {
        let html = "<html><body><p>Our story since 1992.</p></body></html>";
        let doc = Html::parse_document(html);
        assert_eq!(classify(&doc, &url("/story"), &site()), PageKind::Unknown);
    }

    #[test]
    fn test_site_selector_extends_detection() {
        let html = r#"<html><body><main class="pdp-main">...</main></body></html>"#;
        let doc = Html::parse_document(html);
        let mut site = site();
        site.product_selectors = vec![".pdp-main".to_string()];
        // Container (2) + product path (2) clears the threshold
        assert_eq!(
            classify(&doc, &url("/item/9"), &site),
            PageKind::Product
        );
    }

    #[test]
    fn test_higher_threshold_demands_more_signals() {
        let html = r#"<html><body><div class="product-details">...</div></body></html>"#;
        let doc = Html::parse_document(html);
        let mut strict = site();
        strict.detection_threshold = 5;
        assert_eq!(
            classify(&doc, &url("/product/123"), &strict),
            PageKind::Unknown
        );
    }
}
