//! Parsed-page analysis
//!
//! Pure functions over parsed HTML: link extraction for frontier
//! expansion, product-vs-listing classification, and image candidate
//! extraction from product pages.
//!
//! `scraper::Html` is not `Send`, so callers parse and analyze inside
//! a synchronous scope and drop the document before the next await.

pub mod classify;
pub mod images;
pub mod links;

pub use classify::{classify, PageKind};
pub use images::{extract_image_candidates, ImageCandidate};
pub use links::extract_links;
