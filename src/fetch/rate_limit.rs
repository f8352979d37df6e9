//! Per-domain politeness rate limiting
//!
//! Each domain gets its own async critical section holding the
//! timestamp of the last permitted request. A caller acquiring a slot
//! reads the timestamp, sleeps off any remaining deficit, and writes
//! the new timestamp before releasing the lock, so two callers can
//! never both observe a stale timestamp and fire simultaneously.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct DomainSlot {
    last_permitted: Option<Instant>,
}

/// Per-domain rate limiter
///
/// Never fails and never rejects; it only delays. Callers queue FIFO
/// on the per-domain lock with no further fairness guarantee.
pub struct RateLimiter {
    default_interval: Duration,
    intervals: StdMutex<HashMap<String, Duration>>,
    slots: StdMutex<HashMap<String, Arc<Mutex<DomainSlot>>>>,
}

impl RateLimiter {
    /// Creates a rate limiter with a default requests-per-second limit
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            default_interval: Duration::from_secs_f64(1.0 / requests_per_second),
            intervals: StdMutex::new(HashMap::new()),
            slots: StdMutex::new(HashMap::new()),
        }
    }

    /// Overrides the request rate for one domain
    pub fn set_domain_rate(&self, domain: &str, requests_per_second: f64) {
        let interval = Duration::from_secs_f64(1.0 / requests_per_second);
        self.intervals
            .lock()
            .unwrap()
            .insert(domain.to_string(), interval);
    }

    /// Suspends until a request to `domain` is permitted, then records
    /// the permission timestamp
    ///
    /// The read-sleep-write sequence runs entirely inside the domain's
    /// critical section; the sleep is the only await under the lock.
    pub async fn acquire(&self, domain: &str) {
        let slot = self.slot(domain);
        let interval = self.interval(domain);

        let mut state = slot.lock().await;
        if let Some(last) = state.last_permitted {
            let elapsed = Instant::now().duration_since(last);
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        state.last_permitted = Some(Instant::now());
    }

    fn slot(&self, domain: &str) -> Arc<Mutex<DomainSlot>> {
        let mut slots = self.slots.lock().unwrap();
        slots
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(DomainSlot::default())))
            .clone()
    }

    fn interval(&self, domain: &str) -> Duration {
        self.intervals
            .lock()
            .unwrap()
            .get(domain)
            .copied()
            .unwrap_or(self.default_interval)
    }
}
