//! Redis backend

use super::{KeyValueBackend, WriteMode};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::RedisError;
use std::time::Duration;
use tracing::debug;
use warden_core::{Error, Result};

/// Backend talking to a Redis server through a multiplexed connection
///
/// The connection manager reconnects on its own and is cheap to clone, so
/// every call works on its own clone instead of taking a lock.
#[derive(Clone)]
pub struct RedisBackend {
    endpoint: String,
    connection: ConnectionManager,
}

impl RedisBackend {
    /// Open a connection to `url`
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::configuration(format!("invalid store URL: {e}")))?;
        // Log the address only, never credentials from the URL
        let endpoint = client.get_connection_info().addr.to_string();
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::network(endpoint.clone(), e.to_string()))?;
        debug!(endpoint = %endpoint, "connected to redis");
        Ok(Self {
            endpoint,
            connection,
        })
    }

    fn map_error(&self, operation: &str, error: RedisError) -> Error {
        if error.is_io_error()
            || error.is_timeout()
            || error.is_connection_dropped()
            || error.is_connection_refusal()
        {
            Error::network(self.endpoint.clone(), format!("{operation}: {error}"))
        } else {
            Error::store_with_source(operation, error.to_string(), error)
        }
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn ping(&self) -> Result<()> {
        let mut connection = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|e| self.map_error("ping", e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut connection = self.connection.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut connection)
            .await
            .map_err(|e| self.map_error("get", e))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration, mode: WriteMode) -> Result<bool> {
        let mut connection = self.connection.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("PX").arg(ttl_millis(ttl));
        if mode == WriteMode::IfAbsent {
            cmd.arg("NX");
        }
        // SET answers nil when NX prevented the write
        let reply: Option<String> = cmd
            .query_async(&mut connection)
            .await
            .map_err(|e| self.map_error("set", e))?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut connection = self.connection.clone();
        let removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut connection)
            .await
            .map_err(|e| self.map_error("delete", e))?;
        Ok(removed > 0)
    }

    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64> {
        let mut connection = self.connection.clone();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("INCR")
            .arg(key)
            .cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_millis(ttl))
            .ignore();
        let (count,): (i64,) = pipe
            .query_async(&mut connection)
            .await
            .map_err(|e| self.map_error("increment", e))?;
        Ok(count)
    }
}
