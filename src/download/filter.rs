//! Post-download content filtering
//!
//! A filter inspects a persisted image file and decides whether it
//! belongs in the output set. Rejected files are deleted, but their
//! content hash stays in the duplicate index so the same bytes are
//! never fetched and re-judged again.

use std::path::Path;

/// Accept/reject hook applied after an image lands on disk
pub trait ContentFilter: Send + Sync {
    /// Returns true when the file should be kept
    fn accept(&self, path: &Path) -> bool;
}

/// Filter that keeps everything
pub struct AcceptAll;

impl ContentFilter for AcceptAll {
    fn accept(&self, _path: &Path) -> bool {
        true
    }
}

/// Filter that rejects files below a minimum byte size
///
/// Tracking pixels and placeholder spacers survive the URL-pattern and
/// dimension checks often enough to make a size floor worthwhile.
pub struct MinimumSize {
    pub min_bytes: u64,
}

impl ContentFilter for MinimumSize {
    fn accept(&self, path: &Path) -> bool {
        std::fs::metadata(path)
            .map(|meta| meta.len() >= self.min_bytes)
            .unwrap_or(false)
    }
}
