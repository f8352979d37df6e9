//! Bounded LRU cache of page fetch results
//!
//! Keyed by URL, refreshed on access, evicting the least-recently-used
//! entry when full. Image-byte fetches never go through this cache.

use crate::fetch::FetchedResponse;
use std::collections::HashMap;
use std::sync::Mutex;

struct CacheEntry {
    value: FetchedResponse,
    last_access: u64,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    // Monotonic access counter; avoids clock-resolution ties
    clock: u64,
}

/// Bounded response cache with least-recently-used eviction
///
/// All access goes through one short-held lock; no I/O happens inside
/// the critical section.
pub struct ResponseCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl ResponseCache {
    /// Creates a cache holding at most `capacity` responses
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                clock: 0,
            }),
        }
    }

    /// Looks up a cached response, refreshing its recency on hit
    pub fn get(&self, url: &str) -> Option<FetchedResponse> {
        let mut inner = self.inner.lock().unwrap();
        inner.clock += 1;
        let clock = inner.clock;

        let entry = inner.entries.get_mut(url)?;
        entry.last_access = clock;
        Some(entry.value.clone())
    }

    /// Inserts a response, evicting the least-recently-accessed entry
    /// first when at capacity
    pub fn put(&self, url: &str, value: FetchedResponse) {
        let mut inner = self.inner.lock().unwrap();
        inner.clock += 1;
        let clock = inner.clock;

        if !inner.entries.contains_key(url) && inner.entries.len() >= self.capacity {
            if let Some(oldest) = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| key.clone())
            {
                inner.entries.remove(&oldest);
            }
        }

        inner.entries.insert(
            url.to_string(),
            CacheEntry {
                value,
                last_access: clock,
            },
        );
    }

    /// Returns the number of cached responses
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// Returns true when the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether a URL is currently cached, without refreshing it
    pub fn contains(&self, url: &str) -> bool {
        self.inner.lock().unwrap().entries.contains_key(url)
    }
}
