//! Store-backed rate limiting shared by every process

use crate::store::SessionStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use warden_config::AccessConfig;
use warden_core::Result;
use warden_limiter::RateLimit;

/// Per-minute counters in the backing store, keyed by service and client
pub struct StoreRateLimit {
    store: Arc<SessionStore>,
    limits: HashMap<String, u32>,
}

impl StoreRateLimit {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            limits: HashMap::new(),
        }
    }

    pub fn from_config(store: Arc<SessionStore>, config: &AccessConfig) -> Self {
        let mut limit = Self::new(store);
        for service in &config.limiters {
            limit.insert(service.service.clone(), service.limit_per_minute);
        }
        limit
    }

    pub fn insert(&mut self, service: impl Into<String>, limit_per_minute: u32) {
        self.limits.insert(service.into(), limit_per_minute);
    }
}

#[async_trait]
impl RateLimit for StoreRateLimit {
    async fn check(&self, service: &str, client: &str) -> Result<bool> {
        let Some(&limit) = self.limits.get(service) else {
            return Ok(true);
        };
        let allowed = self.store.is_within_rate_limit(service, client, limit).await?;
        if !allowed {
            warn!(service = %service, client = %client, limit, "rate limit exceeded");
        }
        Ok(allowed)
    }
}
