//! Session, cache and rate-counter operations over a key-value backend

use crate::backend::{KeyValueBackend, MemoryBackend, RedisBackend, WriteMode};
use crate::keys::KeySpace;
use crate::session::SessionRecord;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use warden_access::{AccessGrantMap, AccessRevocationSet, RevokePolicy};
use warden_config::{AccessConfig, SessionIpPolicy, StoreConfig};
use warden_core::{Error, Result};
use warden_utils::cache_event;

/// URL scheme selecting the in-process backend
const MEMORY_SCHEME: &str = "memory://";

/// Process-wide handle to the backing store
///
/// Cloning the handle is cheap; every clone shares the same backend.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueBackend>,
    keys: KeySpace,
    ip_policy: SessionIpPolicy,
    op_timeout: Duration,
    cache_ttl: Duration,
    session_ttl: Duration,
    rate_window: Duration,
}

impl SessionStore {
    /// Connect to the configured store and make sure it answers
    ///
    /// Failing here is a startup error; request-time failures are
    /// reported per operation instead.
    pub async fn connect(config: &AccessConfig) -> Result<Self> {
        let store = config
            .store
            .as_ref()
            .ok_or_else(|| Error::configuration("no store configured"))?;

        let backend: Arc<dyn KeyValueBackend> = if store.url.starts_with(MEMORY_SCHEME) {
            Arc::new(MemoryBackend::new())
        } else {
            Arc::new(RedisBackend::connect(&store.url).await?)
        };

        let session_store = Self::with_backend(backend, config);
        session_store
            .run("ping", session_store.backend.ping())
            .await
            .map_err(|e| Error::configuration(format!("store is unreachable: {e}")))?;
        Ok(session_store)
    }

    /// Build a store over an existing backend, taking timings from `config`
    pub fn with_backend(backend: Arc<dyn KeyValueBackend>, config: &AccessConfig) -> Self {
        let defaults = StoreConfig::default();
        let store = config.store.as_ref().unwrap_or(&defaults);
        Self {
            backend,
            keys: KeySpace::new(config.key_prefix.clone()),
            ip_policy: config.session_ip_policy,
            op_timeout: store.op_timeout(),
            cache_ttl: store.cache_ttl(),
            session_ttl: config.session_ttl(),
            rate_window: store.rate_window(),
        }
    }

    /// Override the deadline of each store round trip
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Override the rate-counter window
    pub fn with_rate_window(mut self, rate_window: Duration) -> Self {
        self.rate_window = rate_window;
        self
    }

    pub fn endpoint(&self) -> &str {
        self.backend.endpoint()
    }

    pub fn ip_policy(&self) -> SessionIpPolicy {
        self.ip_policy
    }

    /// Bound a backend call by the operation timeout
    async fn run<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.op_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(operation, self.op_timeout)),
        }
    }

    /// Fetch the session record, validated against the requesting IP
    pub async fn get_access_token(&self, session_id: &str, ip: &str) -> Result<SessionRecord> {
        let key = self.keys.session(session_id);
        let data = self
            .run("get_session", self.backend.get(&key))
            .await?
            .ok_or_else(|| Error::not_found(key.clone()))?;
        let record: SessionRecord = serde_json::from_str(&data)?;

        if record.ip != ip {
            match self.ip_policy {
                SessionIpPolicy::Enforce => {
                    return Err(Error::session_mismatch(session_id, record.ip, ip));
                }
                SessionIpPolicy::Warn => {
                    warn!(
                        session_id = %session_id,
                        expected_ip = %record.ip,
                        actual_ip = %ip,
                        "session presented from a different address"
                    );
                }
                SessionIpPolicy::Ignore => {}
            }
        }
        Ok(record)
    }

    /// Persist a session record, replacing any previous one
    pub async fn set_access_token(&self, record: &SessionRecord) -> Result<()> {
        let key = self.keys.session(&record.session_id);
        let data = serde_json::to_string(record)?;
        self.run(
            "set_session",
            self.backend
                .set(&key, &data, self.session_ttl, WriteMode::Overwrite),
        )
        .await?;
        Ok(())
    }

    /// Start a new session holding `access`
    ///
    /// The record is only written if no session exists under `session_id`;
    /// an existing one is reported as an error and left untouched.
    pub async fn create_session(
        &self,
        session_id: &str,
        ip: &str,
        access: &AccessGrantMap,
    ) -> Result<SessionRecord> {
        let mut record = SessionRecord::new(session_id, ip);
        record.access.merge(access);

        let key = self.keys.session(session_id);
        let data = serde_json::to_string(&record)?;
        let created = self
            .run(
                "create_session",
                self.backend
                    .set(&key, &data, self.session_ttl, WriteMode::IfAbsent),
            )
            .await?;
        if !created {
            return Err(Error::store(
                "create_session",
                format!("session '{session_id}' already exists"),
            ));
        }
        debug!(session_id = %session_id, grants = record.access.len(), "session created");
        Ok(record)
    }

    /// Merge `access` into the session, creating the session if needed
    pub async fn add_session_access(
        &self,
        session_id: &str,
        ip: &str,
        access: &AccessGrantMap,
    ) -> Result<SessionRecord> {
        let mut record = match self.get_access_token(session_id, ip).await {
            Ok(record) => record,
            Err(Error::NotFound { .. }) => SessionRecord::new(session_id, ip),
            Err(e) => return Err(e),
        };
        record.access.merge(access);
        self.set_access_token(&record).await?;
        debug!(session_id = %session_id, grants = record.access.len(), "session access added");
        Ok(record)
    }

    /// Remove revoked grants from the session, deleting it once empty
    pub async fn revoke_session_access(
        &self,
        session_id: &str,
        ip: &str,
        revoke: &AccessRevocationSet,
    ) -> Result<()> {
        let mut record = match self.get_access_token(session_id, ip).await {
            Ok(record) => record,
            Err(Error::NotFound { .. }) => return Ok(()),
            Err(e) => return Err(e),
        };
        record.access.revoke(revoke, RevokePolicy::Remove);

        if record.access.is_empty() {
            self.delete_session(session_id).await?;
        } else {
            self.set_access_token(&record).await?;
        }
        debug!(session_id = %session_id, revoked = revoke.len(), "session access revoked");
        Ok(())
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<bool> {
        let key = self.keys.session(session_id);
        self.run("delete_session", self.backend.delete(&key)).await
    }

    /// Cache a JSON-serialisable value for the cache TTL
    ///
    /// With `overwrite = false` the write only happens if no value is cached
    /// yet. Returns whether the value was written.
    pub async fn cache_value<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        overwrite: bool,
    ) -> Result<bool> {
        let data = serde_json::to_string(value)?;
        let mode = if overwrite {
            WriteMode::Overwrite
        } else {
            WriteMode::IfAbsent
        };
        let key = self.keys.cache(key);
        self.run("cache_value", self.backend.set(&key, &data, self.cache_ttl, mode))
            .await
    }

    /// Read a cached value
    ///
    /// A missing key is `Error::NotFound`, an undecodable one `Error::Json`;
    /// both satisfy `Error::is_cache_miss`.
    pub async fn get_cached_value<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let key = self.keys.cache(key);
        let data = self.run("get_cached_value", self.backend.get(&key)).await?;
        let value = data
            .ok_or_else(|| Error::not_found(key.clone()))
            .and_then(|data| Ok(serde_json::from_str(&data)?));
        cache_event(&key, value.is_ok());
        value
    }

    /// Drop a cached value
    pub async fn uncache_value(&self, key: &str) -> Result<bool> {
        let key = self.keys.cache(key);
        self.run("uncache_value", self.backend.delete(&key)).await
    }

    /// Count one request of `request_type` from `client_id` and report
    /// whether the count is still within `limit_per_minute`
    ///
    /// The request that pushes the count over the limit is itself rejected.
    pub async fn is_within_rate_limit(
        &self,
        request_type: &str,
        client_id: &str,
        limit_per_minute: u32,
    ) -> Result<bool> {
        let key = self.keys.rate(request_type, client_id);
        let count = self
            .run("rate_limit", self.backend.increment(&key, self.rate_window))
            .await?;
        Ok(count <= i64::from(limit_per_minute))
    }
}
