//! Registry of named services, each with its own client limiters

use crate::bucket::TokenBucket;
use crate::registry::ClientLimiters;
use crate::strategy::RateLimit;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use warden_config::AccessConfig;
use warden_core::Result;

/// In-process limiters keyed by service name
///
/// The set of services is fixed at startup, so lookups need no locking;
/// only the per-client maps inside each service are concurrent.
#[derive(Default)]
pub struct RateLimiters {
    services: HashMap<String, ClientLimiters>,
}

impl RateLimiters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AccessConfig) -> Self {
        let mut limiters = Self::new();
        for limit in &config.limiters {
            limiters.insert(ClientLimiters::from_config(limit, &config.limiter_eviction));
        }
        limiters
    }

    pub fn insert(&mut self, limiters: ClientLimiters) {
        self.services.insert(limiters.service().to_string(), limiters);
    }

    pub fn service(&self, service: &str) -> Option<&ClientLimiters> {
        self.services.get(service)
    }

    /// Bucket for `client` within `service`, or `None` for unknown services
    pub fn get(&self, service: &str, client: &str) -> Option<Arc<TokenBucket>> {
        self.services.get(service).map(|limiters| limiters.get(client))
    }

    /// Sweep idle buckets of every service
    pub fn sweep_idle(&self) -> usize {
        self.services.values().map(ClientLimiters::sweep_idle).sum()
    }
}

#[async_trait]
impl RateLimit for RateLimiters {
    async fn check(&self, service: &str, client: &str) -> Result<bool> {
        let Some(bucket) = self.get(service, client) else {
            return Ok(true);
        };
        let allowed = bucket.try_acquire();
        if !allowed {
            warn!(service = %service, client = %client, "rate limit exceeded");
        }
        Ok(allowed)
    }
}
