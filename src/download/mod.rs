//! Image download coordination
//!
//! Downloads a job's image candidates in bounded concurrent batches,
//! deduplicating by content hash across all jobs and enforcing the
//! per-site image budget at batch granularity.

pub mod audit;
pub mod dedup;
pub mod filter;

pub use audit::{AuditLog, AuditRecord};
pub use dedup::DuplicateIndex;
pub use filter::{AcceptAll, ContentFilter, MinimumSize};

use crate::fetch::PageProvider;
use crate::page::ImageCandidate;
use crate::Result;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use url::Url;

/// Candidates downloaded concurrently per batch
const DOWNLOAD_BATCH_SIZE: usize = 15;

/// Extensions accepted straight from the image URL path
const KNOWN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "avif"];

/// Per-job download tally
#[derive(Debug, Default, Clone, Copy)]
pub struct DownloadTally {
    /// Images persisted and kept
    pub saved: u32,
    /// Candidates whose bytes were already in the index
    pub duplicates: u32,
    /// Candidates that failed to fetch or persist
    pub failed: u32,
    /// Persisted files rejected by the content filter
    pub filtered: u32,
}

/// Drives image downloads for one crawl job
///
/// The duplicate index and audit log are shared across jobs; the
/// budget and tally are per job. The budget is checked before each
/// batch, not before each download, so a job may finish at most one
/// batch minus one over its budget.
pub struct DownloadCoordinator {
    provider: Arc<dyn PageProvider>,
    index: Arc<DuplicateIndex>,
    audit: Arc<AuditLog>,
    filter: Option<Arc<dyn ContentFilter>>,
    image_dir: PathBuf,
    site_name: String,
    budget: Option<u32>,
    tally: Mutex<DownloadTally>,
}

impl DownloadCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn PageProvider>,
        index: Arc<DuplicateIndex>,
        audit: Arc<AuditLog>,
        filter: Option<Arc<dyn ContentFilter>>,
        image_dir: PathBuf,
        site_name: String,
        budget: Option<u32>,
    ) -> Self {
        Self {
            provider,
            index,
            audit,
            filter,
            image_dir,
            site_name,
            budget,
            tally: Mutex::new(DownloadTally::default()),
        }
    }

    /// Downloads a set of candidates in batches, returning the tally
    ///
    /// Per-candidate failures are logged and counted but never abort
    /// the batch or the job.
    pub async fn harvest(self: &Arc<Self>, candidates: Vec<ImageCandidate>) -> DownloadTally {
        for batch in candidates.chunks(DOWNLOAD_BATCH_SIZE) {
            if self.budget_met() {
                tracing::info!(
                    "Image budget reached for {}, stopping downloads",
                    self.site_name
                );
                break;
            }

            let mut set = JoinSet::new();
            for candidate in batch {
                let coordinator = Arc::clone(self);
                let candidate = candidate.clone();
                set.spawn(async move {
                    if let Err(error) = coordinator.download_one(&candidate).await {
                        tracing::warn!("Failed to save {}: {}", candidate.url, error);
                        coordinator.record(|tally| tally.failed += 1);
                    }
                });
            }
            while set.join_next().await.is_some() {}
        }

        self.snapshot()
    }

    /// Current tally for this job
    pub fn snapshot(&self) -> DownloadTally {
        self.tally.lock().map(|tally| *tally).unwrap_or_default()
    }

    fn budget_met(&self) -> bool {
        match self.budget {
            Some(budget) => self.snapshot().saved >= budget,
            None => false,
        }
    }

    fn record(&self, update: impl FnOnce(&mut DownloadTally)) {
        if let Ok(mut tally) = self.tally.lock() {
            update(&mut tally);
        }
    }

    async fn download_one(self: &Arc<Self>, candidate: &ImageCandidate) -> Result<()> {
        let response = match self.provider.fetch_uncached(&candidate.url).await {
            Ok(response) => response,
            Err(error) => {
                tracing::debug!("Image fetch failed for {}: {}", candidate.url, error);
                self.record(|tally| tally.failed += 1);
                return Ok(());
            }
        };

        let hash = DuplicateIndex::content_hash(&response.bytes);
        if !self.index.reserve(&hash)? {
            tracing::debug!("Duplicate image content at {}", candidate.url);
            self.record(|tally| tally.duplicates += 1);
            return Ok(());
        }

        let filename = self.build_filename(&candidate.url, &hash, response.content_type.as_deref());
        let path = self.image_dir.join(&filename);
        if let Err(error) = tokio::fs::write(&path, &response.bytes).await {
            // Nothing landed on disk, so the hash must stay claimable
            // for retries and later runs
            self.index.release(&hash);
            return Err(error.into());
        }

        if let Some(filter) = &self.filter {
            if !filter.accept(&path) {
                // Rejected bytes are committed so they are never
                // fetched and judged again
                self.index.commit(&hash)?;
                tokio::fs::remove_file(&path).await?;
                tracing::debug!("Filtered out {}", filename);
                self.record(|tally| tally.filtered += 1);
                return Ok(());
            }
        }

        self.index.commit(&hash)?;
        self.audit
            .append(&AuditRecord {
                source_page: candidate.source_page.to_string(),
                site: self.site_name.clone(),
                image_url: candidate.url.to_string(),
                filename,
                downloaded_at: Utc::now().to_rfc3339(),
            })
            .await?;

        self.record(|tally| tally.saved += 1);
        Ok(())
    }

    fn build_filename(&self, image_url: &Url, hash: &str, content_type: Option<&str>) -> String {
        let extension = url_extension(image_url)
            .or_else(|| content_type.and_then(extension_for_content_type))
            .unwrap_or("jpg");
        let timestamp = Utc::now().format("%Y%m%d%H%M%S");
        format!(
            "{}_{}_{}.{}",
            sanitize_site_name(&self.site_name),
            timestamp,
            &hash[..8],
            extension
        )
    }
}

fn sanitize_site_name(name: &str) -> String {
    name.to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn url_extension(url: &Url) -> Option<&'static str> {
    let path = url.path().to_ascii_lowercase();
    let (_, extension) = path.rsplit_once('.')?;
    KNOWN_EXTENSIONS
        .iter()
        .find(|known| **known == extension)
        .copied()
}

fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    match essence {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/avif" => Some("avif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchError, FetchedResponse};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Serves fixed image bytes per URL
    struct FakeImageProvider {
        images: HashMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl PageProvider for FakeImageProvider {
        async fn fetch(&self, url: &Url) -> std::result::Result<FetchedResponse, FetchError> {
            match self.images.get(url.as_str()) {
                Some(bytes) => Ok(FetchedResponse {
                    bytes: bytes.clone(),
                    content_type: Some("image/jpeg".to_string()),
                    final_url: url.to_string(),
                }),
                None => Err(FetchError::NotFound),
            }
        }
    }

    struct Fixture {
        dir: TempDir,
        coordinator: Arc<DownloadCoordinator>,
    }

    fn fixture(images: Vec<(&str, &[u8])>, budget: Option<u32>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(FakeImageProvider {
            images: images
                .into_iter()
                .map(|(url, bytes)| (url.to_string(), bytes.to_vec()))
                .collect(),
        });
        let index = Arc::new(DuplicateIndex::open(&dir.path().join("index.txt")).unwrap());
        let audit = Arc::new(AuditLog::open(&dir.path().join("audit.csv")).unwrap());
        let coordinator = Arc::new(DownloadCoordinator::new(
            provider,
            index,
            audit,
            None,
            dir.path().to_path_buf(),
            "Maison Une".to_string(),
            budget,
        ));
        Fixture { dir, coordinator }
    }

    fn candidate(url: &str) -> ImageCandidate {
        ImageCandidate {
            url: Url::parse(url).unwrap(),
            source_page: Url::parse("https://example.com/product/1").unwrap(),
        }
    }

    fn saved_images(dir: &TempDir) -> Vec<String> {
        std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".jpg"))
            .collect()
    }

    #[tokio::test]
    async fn test_saves_distinct_images() {
        let fixture = fixture(
            vec![
                ("https://cdn.example.com/a.jpg", b"aaaa" as &[u8]),
                ("https://cdn.example.com/b.jpg", b"bbbb"),
            ],
            None,
        );
        let tally = fixture
            .coordinator
            .harvest(vec![
                candidate("https://cdn.example.com/a.jpg"),
                candidate("https://cdn.example.com/b.jpg"),
            ])
            .await;

        assert_eq!(tally.saved, 2);
        assert_eq!(saved_images(&fixture.dir).len(), 2);
    }

    #[tokio::test]
    async fn test_same_bytes_two_urls_saved_once() {
        let fixture = fixture(
            vec![
                ("https://cdn.example.com/a.jpg", b"identical" as &[u8]),
                ("https://mirror.example.com/b.jpg", b"identical"),
            ],
            None,
        );
        let tally = fixture
            .coordinator
            .harvest(vec![
                candidate("https://cdn.example.com/a.jpg"),
                candidate("https://mirror.example.com/b.jpg"),
            ])
            .await;

        assert_eq!(tally.saved, 1);
        assert_eq!(tally.duplicates, 1);
        assert_eq!(saved_images(&fixture.dir).len(), 1);
    }

    #[tokio::test]
    async fn test_budget_checked_per_batch() {
        // 20 distinct images, budget 2: the first batch of 15 runs to
        // completion, then the budget check stops the second batch
        let images: Vec<(String, Vec<u8>)> = (0..20)
            .map(|i| {
                (
                    format!("https://cdn.example.com/{}.jpg", i),
                    format!("bytes-{}", i).into_bytes(),
                )
            })
            .collect();
        let fixture = fixture(
            images
                .iter()
                .map(|(url, bytes)| (url.as_str(), bytes.as_slice()))
                .collect(),
            Some(2),
        );
        let candidates: Vec<_> = images
            .iter()
            .map(|(url, _)| candidate(url))
            .collect();

        let tally = fixture.coordinator.harvest(candidates).await;

        assert!(tally.saved >= 2);
        assert!(tally.saved as usize <= 2 + DOWNLOAD_BATCH_SIZE - 1);
        assert!((tally.saved as usize) < 20);
    }

    #[tokio::test]
    async fn test_fetch_failures_counted_not_fatal() {
        let fixture = fixture(
            vec![("https://cdn.example.com/a.jpg", b"aaaa" as &[u8])],
            None,
        );
        let tally = fixture
            .coordinator
            .harvest(vec![
                candidate("https://cdn.example.com/a.jpg"),
                candidate("https://cdn.example.com/missing.jpg"),
            ])
            .await;

        assert_eq!(tally.saved, 1);
        assert_eq!(tally.failed, 1);
    }

    #[tokio::test]
    async fn test_filter_rejection_deletes_file_keeps_hash() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(FakeImageProvider {
            images: [(
                "https://cdn.example.com/a.jpg".to_string(),
                b"tiny".to_vec(),
            )]
            .into_iter()
            .collect(),
        });
        let index = Arc::new(DuplicateIndex::open(&dir.path().join("index.txt")).unwrap());
        let audit = Arc::new(AuditLog::open(&dir.path().join("audit.csv")).unwrap());
        let coordinator = Arc::new(DownloadCoordinator::new(
            provider,
            Arc::clone(&index),
            audit,
            Some(Arc::new(MinimumSize { min_bytes: 1024 })),
            dir.path().to_path_buf(),
            "Maison Une".to_string(),
            None,
        ));

        let tally = coordinator
            .harvest(vec![candidate("https://cdn.example.com/a.jpg")])
            .await;

        assert_eq!(tally.saved, 0);
        assert_eq!(tally.filtered, 1);
        assert_eq!(saved_images(&dir).len(), 0);
        // Bytes remain indexed, in memory and durably
        let hash = DuplicateIndex::content_hash(b"tiny");
        assert!(!index.reserve(&hash).unwrap());
        let reopened = DuplicateIndex::open(&dir.path().join("index.txt")).unwrap();
        assert!(!reopened.reserve(&hash).unwrap());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_bytes_harvestable() {
        let dir = TempDir::new().unwrap();
        let index_path = dir.path().join("index.txt");
        let provider: Arc<dyn PageProvider> = Arc::new(FakeImageProvider {
            images: [(
                "https://cdn.example.com/a.jpg".to_string(),
                b"precious".to_vec(),
            )]
            .into_iter()
            .collect(),
        });

        // First attempt writes into a directory that does not exist
        let coordinator = Arc::new(DownloadCoordinator::new(
            Arc::clone(&provider),
            Arc::new(DuplicateIndex::open(&index_path).unwrap()),
            Arc::new(AuditLog::open(&dir.path().join("audit.csv")).unwrap()),
            None,
            dir.path().join("missing"),
            "Maison Une".to_string(),
            None,
        ));
        let tally = coordinator
            .harvest(vec![candidate("https://cdn.example.com/a.jpg")])
            .await;
        assert_eq!(tally.saved, 0);
        assert_eq!(tally.failed, 1);

        // A later run over the same index file must not treat the
        // never-persisted bytes as a duplicate
        let coordinator = Arc::new(DownloadCoordinator::new(
            provider,
            Arc::new(DuplicateIndex::open(&index_path).unwrap()),
            Arc::new(AuditLog::open(&dir.path().join("audit.csv")).unwrap()),
            None,
            dir.path().to_path_buf(),
            "Maison Une".to_string(),
            None,
        ));
        let tally = coordinator
            .harvest(vec![candidate("https://cdn.example.com/a.jpg")])
            .await;
        assert_eq!(tally.saved, 1);
        assert_eq!(tally.duplicates, 0);
        assert_eq!(saved_images(&dir).len(), 1);
    }

    #[test]
    fn test_filename_parts() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(FakeImageProvider {
            images: HashMap::new(),
        });
        let index = Arc::new(DuplicateIndex::open(&dir.path().join("index.txt")).unwrap());
        let audit = Arc::new(AuditLog::open(&dir.path().join("audit.csv")).unwrap());
        let coordinator = DownloadCoordinator::new(
            provider,
            index,
            audit,
            None,
            dir.path().to_path_buf(),
            "Maison Une".to_string(),
            None,
        );

        let hash = DuplicateIndex::content_hash(b"x");
        let name = coordinator.build_filename(
            &Url::parse("https://cdn.example.com/look.PNG").unwrap(),
            &hash,
            None,
        );
        assert!(name.starts_with("maison_une_"));
        assert!(name.ends_with(".png"));
        assert!(name.contains(&hash[..8]));
    }

    #[test]
    fn test_extension_from_content_type() {
        assert_eq!(
            extension_for_content_type("image/webp"),
            Some("webp")
        );
        assert_eq!(
            extension_for_content_type("image/jpeg; charset=binary"),
            Some("jpg")
        );
        assert_eq!(extension_for_content_type("text/html"), None);
    }
}
