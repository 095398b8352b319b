//! Registry of rate limiters keyed by instance id
//!
//! One controller exists per configured instance that declares a quota.
//! Controllers are created when an instance is added or restored, replaced
//! when its quota changes, and destroyed when it is removed or on shutdown.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use super::controller::RateLimitController;

#[derive(Debug, Clone)]
pub struct RateLimiterRegistry {
    limiters: Arc<DashMap<String, Arc<RateLimitController>>>,
    interval: Duration,
}

impl RateLimiterRegistry {
    /// Empty registry whose limiters use `interval` windows
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            limiters: Arc::new(DashMap::new()),
            interval,
        }
    }

    /// Create a limiter for `id` when `rate_limit` is a positive quota
    ///
    /// An existing limiter for `id` is destroyed first.
    pub fn register(&self, id: &str, rate_limit: Option<u32>) {
        self.remove(id);
        if let Some(limit) = rate_limit.filter(|l| *l > 0) {
            log::debug!("Creating rate limiter for {id}: {limit} requests per {:?}", self.interval);
            self.limiters.insert(
                id.to_string(),
                Arc::new(RateLimitController::new(limit, self.interval)),
            );
        }
    }

    /// Destroy and forget the limiter for `id`, if any
    pub fn remove(&self, id: &str) {
        if let Some((_, limiter)) = self.limiters.remove(id) {
            limiter.destroy();
        }
    }

    /// Limiter for `id`; `None` means requests are not throttled
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<RateLimitController>> {
        self.limiters.get(id).map(|entry| Arc::clone(entry.value()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    /// Destroy every limiter; used on teardown
    pub fn destroy_all(&self) {
        let ids: Vec<String> = self.limiters.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.remove(&id);
        }
    }
}
