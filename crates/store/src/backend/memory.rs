//! In-process backend for tests and store-less development

use super::{KeyValueBackend, WriteMode};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;
use warden_core::{Error, Result};

/// How often writes sweep expired entries out of the map
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    /// `None` when the TTL is too large to represent, i.e. never expires
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() >= expires_at)
    }
}

/// Key-value backend held in a concurrent map with per-entry expiry
///
/// Expired entries are dropped lazily on read and swept from the whole map
/// by writes at most once per sweep interval.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: DashMap<String, MemoryEntry>,
    sweep_interval: Duration,
    last_sweep: Mutex<Instant>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_interval(sweep_interval: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            sweep_interval,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry, returning how many were removed
    pub fn sweep_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "swept expired memory entries");
        }
        removed
    }

    fn maybe_sweep(&self) {
        let Some(mut last_sweep) = self.last_sweep.try_lock() else {
            return; // another writer is sweeping
        };
        if last_sweep.elapsed() < self.sweep_interval {
            return;
        }
        *last_sweep = Instant::now();
        drop(last_sweep);
        self.sweep_expired();
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    fn endpoint(&self) -> &str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.entries.remove_if(key, |_, entry| entry.is_expired());
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration, mode: WriteMode) -> Result<bool> {
        self.maybe_sweep();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if mode == WriteMode::IfAbsent && !occupied.get().is_expired() {
                    return Ok(false);
                }
                occupied.insert(MemoryEntry::new(value.to_string(), ttl));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(MemoryEntry::new(value.to_string(), ttl));
            }
        }
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired()))
    }

    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64> {
        self.maybe_sweep();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| MemoryEntry::new("0".to_string(), ttl));
        if entry.is_expired() {
            entry.value = "0".to_string();
        }
        let current: i64 = entry.value.parse().map_err(|_| {
            Error::store("increment", format!("value at '{key}' is not an integer"))
        })?;
        let next = current + 1;
        *entry = MemoryEntry::new(next.to_string(), ttl);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_set_get_delete() {
        let backend = MemoryBackend::new();
        assert!(backend.set("k", "v", TTL, WriteMode::Overwrite).await.unwrap());
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(backend.delete("k").await.unwrap());
        assert!(!backend.delete("k").await.unwrap());
        assert_eq!(backend.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_if_absent_does_not_clobber() {
        let backend = MemoryBackend::new();
        assert!(backend.set("k", "first", TTL, WriteMode::IfAbsent).await.unwrap());
        assert!(!backend.set("k", "second", TTL, WriteMode::IfAbsent).await.unwrap());
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("first"));

        assert!(backend.set("k", "third", TTL, WriteMode::Overwrite).await.unwrap());
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("third"));
    }

    #[tokio::test]
    async fn test_expiry() {
        let backend = MemoryBackend::new();
        backend
            .set("k", "v", Duration::from_millis(20), WriteMode::Overwrite)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(backend.get("k").await.unwrap(), None);
        assert!(backend.is_empty());

        // An expired key counts as absent for no-clobber writes
        assert!(backend.set("k", "new", TTL, WriteMode::IfAbsent).await.unwrap());
    }

    #[tokio::test]
    async fn test_increment_resets_after_expiry() {
        let backend = MemoryBackend::new();
        let ttl = Duration::from_millis(20);
        assert_eq!(backend.increment("c", ttl).await.unwrap(), 1);
        assert_eq!(backend.increment("c", ttl).await.unwrap(), 2);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(backend.increment("c", ttl).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_writes_sweep_expired_entries() {
        let backend = MemoryBackend::with_sweep_interval(Duration::ZERO);
        let short = Duration::from_millis(20);
        backend.set("a", "1", short, WriteMode::Overwrite).await.unwrap();
        backend.increment("b", short).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        // Nothing reads the expired keys, the next write removes them
        backend.set("c", "3", TTL, WriteMode::Overwrite).await.unwrap();
        assert_eq!(backend.entries.len(), 1);
        assert_eq!(backend.get("c").await.unwrap().as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_sweep_waits_for_interval() {
        let backend = MemoryBackend::new();
        backend
            .set("a", "1", Duration::from_millis(20), WriteMode::Overwrite)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        backend.set("b", "2", TTL, WriteMode::Overwrite).await.unwrap();
        assert_eq!(backend.entries.len(), 2);
        assert_eq!(backend.sweep_expired(), 1);
        assert_eq!(backend.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_never_expires() {
        let backend = MemoryBackend::new();
        backend
            .set("k", "v", Duration::MAX, WriteMode::Overwrite)
            .await
            .unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(backend.increment("c", Duration::MAX).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_increment_rejects_non_integer() {
        let backend = MemoryBackend::new();
        backend.set("c", "text", TTL, WriteMode::Overwrite).await.unwrap();
        assert!(backend.increment("c", TTL).await.is_err());
    }
}
