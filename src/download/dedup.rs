//! Content-hash duplicate index
//!
//! Every persisted image is keyed by the SHA-256 of its bytes. The
//! index is shared across all jobs in a run and persisted as one hex
//! digest per line, so reruns skip already-harvested assets.
//!
//! Claiming a hash is a two-step protocol: `reserve` atomically takes
//! the in-memory claim, and `commit` makes it durable once the bytes
//! are actually on disk. A failed persist calls `release` instead, so
//! the asset stays harvestable on retry and on later runs.

use crate::{LookbookError, Result};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Process-wide index of seen image content hashes
pub struct DuplicateIndex {
    inner: Mutex<IndexInner>,
}

struct IndexInner {
    seen: HashSet<String>,
    index_path: PathBuf,
}

impl DuplicateIndex {
    /// Opens the index file, loading any previously recorded hashes
    ///
    /// A missing file means a fresh run and is not an error.
    pub fn open(index_path: &Path) -> Result<Self> {
        let mut seen = HashSet::new();

        if index_path.exists() {
            let file = File::open(index_path)?;
            for line in BufReader::new(file).lines() {
                let line = line?;
                let hash = line.trim();
                if !hash.is_empty() {
                    seen.insert(hash.to_string());
                }
            }
            tracing::info!(
                "Loaded {} known image hashes from {}",
                seen.len(),
                index_path.display()
            );
        }

        Ok(Self {
            inner: Mutex::new(IndexInner {
                seen,
                index_path: index_path.to_path_buf(),
            }),
        })
    }

    /// Computes the content hash of an image body
    pub fn content_hash(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Atomically claims a hash, returning false if it was already known
    ///
    /// Check and insert happen under one lock so two tasks holding the
    /// same bytes cannot both persist them. The claim is in-memory
    /// only until `commit` records it in the index file.
    pub fn reserve(&self, hash: &str) -> Result<bool> {
        let mut inner = self.lock()?;
        Ok(inner.seen.insert(hash.to_string()))
    }

    /// Durably records a reserved hash in the index file
    ///
    /// Called only after the bytes behind the hash are safely on disk
    /// (or deliberately rejected); a hash that is reserved but never
    /// committed does not survive into the next run.
    pub fn commit(&self, hash: &str) -> Result<()> {
        let inner = self.lock()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&inner.index_path)?;
        writeln!(file, "{}", hash)?;

        Ok(())
    }

    /// Drops a reservation whose bytes were never persisted
    pub fn release(&self, hash: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.seen.remove(hash);
        }
    }

    /// Number of distinct hashes currently claimed
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.seen.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, IndexInner>> {
        self.inner
            .lock()
            .map_err(|_| LookbookError::Index("hash index lock poisoned".to_string()))
    }
}
