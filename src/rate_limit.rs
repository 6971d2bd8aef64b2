//! Rate Limiter (spec §4.3): per-identity token bucket with a background
//! eviction task for idle buckets. Grounded on the teacher's
//! `src/rate_limit.rs` (a `Mutex<HashMap<String, Vec<Instant>>>` sliding
//! window) but redesigned per the spec's REDESIGN FLAGS into a true token
//! bucket, and its periodic-sweep shape is grounded on the teacher's
//! `src/retention.rs` background task.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::ServiceConfig;
use crate::error::AppError;

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    last_used: Instant,
}

impl TokenBucket {
    fn new(burst: f64, now: Instant) -> Self {
        TokenBucket { tokens: burst, last_refill: now, last_used: now }
    }

    fn refill(&mut self, sustained_rps: f64, burst: f64, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * sustained_rps).min(burst);
        self.last_refill = now;
    }

    fn try_take(&mut self, sustained_rps: f64, burst: f64, now: Instant) -> bool {
        self.refill(sustained_rps, burst, now);
        self.last_used = now;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Per-identity token bucket rate limiter. The identity key is the source
/// network address for unauthenticated callers, or the principal id once a
/// request has been authenticated (spec §4.3).
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    allow_list: Mutex<HashSet<String>>,
    deny_list: Mutex<HashSet<String>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        RateLimiter {
            buckets: Mutex::new(HashMap::new()),
            allow_list: Mutex::new(HashSet::new()),
            deny_list: Mutex::new(HashSet::new()),
        }
    }

    pub fn allow(&self, key: &str) {
        self.allow_list.lock().unwrap().insert(key.to_string());
    }

    pub fn deny(&self, key: &str) {
        self.deny_list.lock().unwrap().insert(key.to_string());
    }

    /// Deny-list precedes the bucket check; allow-list bypasses both
    /// (spec §4.3). Fails closed: an empty bucket denies the request.
    pub fn check(&self, key: &str, sustained_rps: f64, burst: f64) -> Result<(), AppError> {
        if self.deny_list.lock().unwrap().contains(key) {
            return Err(AppError::RateLimited);
        }
        if self.allow_list.lock().unwrap().contains(key) {
            return Ok(());
        }

        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(burst, now));

        if bucket.try_take(sustained_rps, burst, now) {
            Ok(())
        } else {
            Err(AppError::RateLimited)
        }
    }

    fn evict_idle(&self, idle_for: Duration) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let before = buckets.len();
        buckets.retain(|_, b| now.duration_since(b.last_used) < idle_for);
        let evicted = before - buckets.len();
        if evicted > 0 {
            log::debug!("rate limiter evicted {evicted} idle buckets");
        }
    }
}

/// Spawns the background task that periodically evicts idle buckets
/// (spec §4.3, §5). Shuts down cooperatively when `shutdown` fires.
pub fn spawn_eviction_task(
    limiter: std::sync::Arc<RateLimiter>,
    config: &ServiceConfig,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let cleanup = config.rate_cleanup;
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(cleanup) => {
                    limiter.evict_idle(cleanup);
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        log::info!("rate limiter eviction task shutting down");
                        break;
                    }
                }
            }
        }
    });
}
