//! Per-client bucket registry of one service

use crate::bucket::TokenBucket;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use warden_config::{LimiterEvictionConfig, ServiceLimitConfig};

/// Lazily created token buckets keyed by client identifier
///
/// Creation goes through the map's entry API, so concurrent first requests
/// for an unseen client end up sharing a single bucket. Buckets idle for
/// longer than `idle_timeout` are swept at most once per `sweep_interval`.
pub struct ClientLimiters {
    service: String,
    capacity: u32,
    refill_rate: f64,
    buckets: DashMap<String, Arc<TokenBucket>>,
    idle_timeout: Duration,
    sweep_interval: Duration,
    last_sweep: Mutex<Instant>,
}

impl ClientLimiters {
    pub fn new(
        service: impl Into<String>,
        capacity: u32,
        refill_rate: f64,
        idle_timeout: Duration,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            service: service.into(),
            capacity,
            refill_rate,
            buckets: DashMap::new(),
            idle_timeout,
            sweep_interval,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    pub fn from_config(limit: &ServiceLimitConfig, eviction: &LimiterEvictionConfig) -> Self {
        Self::new(
            limit.service.clone(),
            limit.burst,
            limit.refill_rate(),
            eviction.idle_timeout(),
            eviction.sweep_interval(),
        )
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Bucket of `client`, created on first use
    pub fn get(&self, client: &str) -> Arc<TokenBucket> {
        self.maybe_sweep();

        if let Some(bucket) = self.buckets.get(client) {
            return Arc::clone(bucket.value());
        }

        let bucket = self
            .buckets
            .entry(client.to_string())
            .or_insert_with(|| Arc::new(TokenBucket::new(self.capacity, self.refill_rate)));
        Arc::clone(bucket.value())
    }

    /// Number of tracked clients
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drop buckets idle for longer than the idle timeout, returning how many
    /// were removed. Buckets still held by a caller are kept.
    pub fn sweep_idle(&self) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| {
            Arc::strong_count(bucket) > 1 || bucket.idle_for() < self.idle_timeout
        });
        let removed = before.saturating_sub(self.buckets.len());
        if removed > 0 {
            debug!(service = %self.service, removed, "evicted idle rate limit buckets");
        }
        removed
    }

    fn maybe_sweep(&self) {
        let Some(mut last_sweep) = self.last_sweep.try_lock() else {
            return; // another caller is sweeping
        };
        if last_sweep.elapsed() < self.sweep_interval {
            return;
        }
        *last_sweep = Instant::now();
        drop(last_sweep);
        self.sweep_idle();
    }
}
