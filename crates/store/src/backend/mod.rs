//! Key-value backends behind the session store

mod memory;
mod redis;

pub use self::memory::MemoryBackend;
pub use self::redis::RedisBackend;

use async_trait::async_trait;
use std::time::Duration;
use warden_core::Result;

/// Whether a write may replace an existing value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Overwrite,
    /// Write only if the key is absent (no-clobber)
    IfAbsent,
}

/// Minimal set of operations the store needs from a key-value service
///
/// Implementations must be safe to share between concurrent request tasks
/// without external locking.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Human-readable endpoint used in errors and logs
    fn endpoint(&self) -> &str;

    async fn ping(&self) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` with a TTL; returns whether the value was written
    async fn set(&self, key: &str, value: &str, ttl: Duration, mode: WriteMode) -> Result<bool>;

    /// Returns whether a key was removed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Increment an integer counter and refresh its TTL as one atomic unit,
    /// returning the incremented value
    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64>;
}
