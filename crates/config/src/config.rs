//! Centralized configuration for the access-control core
//!
//! The configuration is immutable after construction and can be safely
//! shared across request tasks.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use warden_core::{Error, Result, DEFAULT_KEY_PREFIX};

/// Default lifetime of grant and session cookies (one week)
const DEFAULT_COOKIE_EXPIRATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Default lifetime of cached values (one hour)
const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60;

/// Default deadline for a single store round trip
const DEFAULT_OP_TIMEOUT_MS: u64 = 500;

/// Default rate-limit window of the store-backed counter
const DEFAULT_RATE_WINDOW_SECS: u64 = 60;

/// Default idle time after which an in-process bucket is evicted
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 10 * 60;

/// Default interval between idle-bucket sweeps
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5 * 60;

/// Upper bound for every configured lifetime: ten years
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// How a session lookup treats a request coming from a different IP than
/// the one the session was created from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionIpPolicy {
    /// Reject the session; the request continues with cookie-only grants
    #[default]
    Enforce,
    /// Log the mismatch and accept the session
    Warn,
    /// Do not compare addresses
    Ignore,
}

impl std::str::FromStr for SessionIpPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enforce" => Ok(SessionIpPolicy::Enforce),
            "warn" => Ok(SessionIpPolicy::Warn),
            "ignore" => Ok(SessionIpPolicy::Ignore),
            other => Err(Error::configuration(format!(
                "unknown session IP policy '{other}', expected enforce, warn or ignore"
            ))),
        }
    }
}

/// Which rate-limit strategy guards services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitStrategy {
    /// Per-process token buckets
    #[default]
    InProcess,
    /// Shared per-minute counters in the backing store
    Store,
}

/// Connection and timing settings of the backing key-value store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Connection URL, e.g. `redis://localhost:6379/0`
    pub url: String,
    /// Deadline for each store round trip, in milliseconds
    pub op_timeout_ms: u64,
    /// TTL of cached values, in seconds
    pub cache_ttl_secs: u64,
    /// TTL of session records; defaults to the cookie expiration
    pub session_ttl_secs: Option<u64>,
    /// Window of the store-backed rate counter, in seconds
    pub rate_window_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            op_timeout_ms: DEFAULT_OP_TIMEOUT_MS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            session_ttl_secs: None,
            rate_window_secs: DEFAULT_RATE_WINDOW_SECS,
        }
    }
}

impl StoreConfig {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }
}

/// Rate limit of one named service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceLimitConfig {
    /// Service name, e.g. `auth`
    pub service: String,
    /// Sustained requests per minute per client
    pub limit_per_minute: u32,
    /// Burst capacity of the in-process token bucket
    #[serde(default = "default_burst")]
    pub burst: u32,
}

fn default_burst() -> u32 {
    1
}

impl ServiceLimitConfig {
    pub fn new(service: impl Into<String>, limit_per_minute: u32, burst: u32) -> Self {
        Self {
            service: service.into(),
            limit_per_minute,
            burst,
        }
    }

    /// Token refill rate in tokens per second
    pub fn refill_rate(&self) -> f64 {
        f64::from(self.limit_per_minute) / 60.0
    }
}

/// Eviction of idle in-process buckets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterEvictionConfig {
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for LimiterEvictionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl LimiterEvictionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Complete access-control configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Prefix of every store key (`<prefix>-cache:...`)
    pub key_prefix: String,
    /// Lifetime of grant and session cookies, in seconds
    pub cookie_expiration_secs: u64,
    /// IP pinning policy of session lookups
    pub session_ip_policy: SessionIpPolicy,
    /// Backing store; `None` runs in cookie-only mode
    pub store: Option<StoreConfig>,
    /// Strategy used by `RequestContext::is_within_rate_limit`
    pub rate_limit_strategy: RateLimitStrategy,
    /// Per-service limits
    pub limiters: Vec<ServiceLimitConfig>,
    /// Idle eviction of in-process buckets
    pub limiter_eviction: LimiterEvictionConfig,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            cookie_expiration_secs: DEFAULT_COOKIE_EXPIRATION_SECS,
            session_ip_policy: SessionIpPolicy::default(),
            store: None,
            rate_limit_strategy: RateLimitStrategy::default(),
            limiters: Vec::new(),
            limiter_eviction: LimiterEvictionConfig::default(),
        }
    }
}

impl AccessConfig {
    pub fn cookie_expiration(&self) -> Duration {
        Duration::from_secs(self.cookie_expiration_secs)
    }

    /// TTL applied to session records
    pub fn session_ttl(&self) -> Duration {
        self.store
            .as_ref()
            .and_then(|store| store.session_ttl_secs)
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.cookie_expiration())
    }

    /// Check the invariants every other crate relies on
    pub fn validate(&self) -> Result<()> {
        if self.key_prefix.trim().is_empty() {
            return Err(Error::configuration("key_prefix must not be empty"));
        }
        if self.cookie_expiration_secs == 0 {
            return Err(Error::configuration(
                "cookie_expiration_secs must be greater than zero",
            ));
        }
        check_ttl("cookie_expiration_secs", self.cookie_expiration_secs)?;

        if let Some(store) = &self.store {
            if store.url.trim().is_empty() {
                return Err(Error::configuration("store.url must not be empty"));
            }
            if store.op_timeout_ms == 0 {
                return Err(Error::configuration(
                    "store.op_timeout_ms must be greater than zero",
                ));
            }
            if store.rate_window_secs == 0 {
                return Err(Error::configuration(
                    "store.rate_window_secs must be greater than zero",
                ));
            }
            check_ttl("store.rate_window_secs", store.rate_window_secs)?;
            check_ttl("store.cache_ttl_secs", store.cache_ttl_secs)?;
            if let Some(session_ttl_secs) = store.session_ttl_secs {
                check_ttl("store.session_ttl_secs", session_ttl_secs)?;
            }
        } else if self.rate_limit_strategy == RateLimitStrategy::Store {
            return Err(Error::configuration(
                "rate_limit_strategy 'store' requires a store to be configured",
            ));
        }

        let mut seen = HashSet::new();
        for limiter in &self.limiters {
            if limiter.service.is_empty() {
                return Err(Error::configuration("limiter service name must not be empty"));
            }
            if !seen.insert(limiter.service.as_str()) {
                return Err(Error::configuration(format!(
                    "limiter for service '{}' is configured twice",
                    limiter.service
                )));
            }
            if limiter.limit_per_minute == 0 || limiter.burst == 0 {
                return Err(Error::configuration(format!(
                    "limiter for service '{}' needs a positive limit and burst",
                    limiter.service
                )));
            }
        }

        Ok(())
    }
}

fn check_ttl(field: &str, secs: u64) -> Result<()> {
    if secs > MAX_TTL_SECS {
        return Err(Error::configuration(format!(
            "{field} must be at most {MAX_TTL_SECS} seconds"
        )));
    }
    Ok(())
}
