//! Process-wide handle shared by every request

use http::HeaderMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use warden_config::{AccessConfig, RateLimitStrategy};
use warden_core::{Error, Result};
use warden_limiter::{RateLimit, RateLimiters, TokenBucket};
use warden_store::{SessionStore, StoreRateLimit};
use warden_utils::{ClientIpResolver, HeaderClientIpResolver};

/// Configuration, store, limiters and IP resolver of one process
pub struct RequestContext {
    config: AccessConfig,
    store: Option<Arc<SessionStore>>,
    limiters: Arc<RateLimiters>,
    strategy: Arc<dyn RateLimit>,
    ip_resolver: Arc<dyn ClientIpResolver>,
}

impl RequestContext {
    /// Validate `config` and connect to the configured store
    ///
    /// This is the only place where store errors are fatal.
    pub async fn connect(config: AccessConfig) -> Result<Self> {
        config.validate()?;
        let store = if config.store.is_some() {
            let store = SessionStore::connect(&config).await?;
            info!(endpoint = %store.endpoint(), "session store connected");
            Some(Arc::new(store))
        } else {
            None
        };

        let mut builder = Self::builder(config);
        if let Some(store) = store {
            builder = builder.store(store);
        }
        builder.build()
    }

    pub fn builder(config: AccessConfig) -> RequestContextBuilder {
        RequestContextBuilder::new(config)
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    pub fn store(&self) -> Option<&Arc<SessionStore>> {
        self.store.as_ref()
    }

    pub fn cookie_expiration(&self) -> Duration {
        self.config.cookie_expiration()
    }

    pub fn client_ip(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        self.ip_resolver.client_ip(headers, peer)
    }

    /// In-process bucket of `client` for `service`, `None` for unknown services
    pub fn service_limiter(&self, service: &str, client: &str) -> Option<Arc<TokenBucket>> {
        self.limiters.get(service, client)
    }

    /// Whether one more request of `service` from `client` may proceed
    ///
    /// A strategy that cannot answer lets the request through.
    pub async fn is_within_rate_limit(&self, service: &str, client: &str) -> bool {
        match self.strategy.check(service, client).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(
                    service = %service,
                    client = %client,
                    error = %e,
                    "rate limit check failed, allowing request"
                );
                true
            }
        }
    }
}

/// Builder for [`RequestContext`]
pub struct RequestContextBuilder {
    config: AccessConfig,
    store: Option<Arc<SessionStore>>,
    strategy: Option<Arc<dyn RateLimit>>,
    ip_resolver: Option<Arc<dyn ClientIpResolver>>,
}

impl RequestContextBuilder {
    pub fn new(config: AccessConfig) -> Self {
        Self {
            config,
            store: None,
            strategy: None,
            ip_resolver: None,
        }
    }

    pub fn store(mut self, store: Arc<SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the strategy selected by the configuration
    pub fn rate_limit(mut self, strategy: Arc<dyn RateLimit>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn ip_resolver(mut self, resolver: Arc<dyn ClientIpResolver>) -> Self {
        self.ip_resolver = Some(resolver);
        self
    }

    pub fn build(self) -> Result<RequestContext> {
        let limiters = Arc::new(RateLimiters::from_config(&self.config));

        let strategy: Arc<dyn RateLimit> = match (self.strategy, self.config.rate_limit_strategy) {
            (Some(strategy), _) => strategy,
            (None, RateLimitStrategy::InProcess) => limiters.clone() as Arc<dyn RateLimit>,
            (None, RateLimitStrategy::Store) => {
                let store = self.store.clone().ok_or_else(|| {
                    Error::configuration("rate_limit_strategy 'store' requires a session store")
                })?;
                Arc::new(StoreRateLimit::from_config(store, &self.config))
            }
        };

        Ok(RequestContext {
            config: self.config,
            store: self.store,
            limiters,
            strategy,
            ip_resolver: self
                .ip_resolver
                .unwrap_or_else(|| Arc::new(HeaderClientIpResolver)),
        })
    }
}
