//! Download audit log
//!
//! One CSV row per persisted image, written as downloads complete so a
//! crashed run still leaves a usable record of everything saved.

use crate::{LookbookError, Result};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// One persisted-image record
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// Product page the image came from
    pub source_page: String,
    /// Site name the job crawled
    pub site: String,
    /// Image URL as fetched
    pub image_url: String,
    /// Filename under the output image directory
    pub filename: String,
    /// ISO-8601 timestamp of the download
    pub downloaded_at: String,
}

/// Append-only CSV audit log, shared across jobs
pub struct AuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLog {
    /// Opens the log, writing the header row if the file is new
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            let mut writer = csv::Writer::from_path(path)
                .map_err(|e| LookbookError::Audit(format!("failed to create log: {}", e)))?;
            writer
                .write_record(["source_page", "site", "image_url", "filename", "downloaded_at"])
                .map_err(|e| LookbookError::Audit(e.to_string()))?;
            writer
                .flush()
                .map_err(|e| LookbookError::Audit(e.to_string()))?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    /// Appends one record, serializing concurrent writers
    pub async fn append(&self, record: &AuditRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let file = std::fs::OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        writer
            .write_record([
                &record.source_page,
                &record.site,
                &record.image_url,
                &record.filename,
                &record.downloaded_at,
            ])
            .map_err(|e| LookbookError::Audit(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| LookbookError::Audit(e.to_string()))?;

        Ok(())
    }
}
