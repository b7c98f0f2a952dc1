// ── Response cache ──
//
// Process-wide keyed storage for raw responses. Freshness is checked on
// read only: `now - stored_at < ttl`. Expired entries linger until they
// are overwritten; concurrent writers to one key race and the last write
// wins.

use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::time::Instant;

/// Injectable cache used by fetch controllers.
pub trait ResponseCache: Send + Sync {
    /// The cached payload for `key`, if present and not expired.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store `value` under `key`, replacing any previous entry.
    fn set(&self, key: &str, value: Value, ttl: Duration);

    /// Forget `key`.
    fn remove(&self, key: &str);
}

/// A stored payload and the moment it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub payload: Value,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(payload: Value, ttl: Duration) -> Self {
        Self {
            payload,
            stored_at: Instant::now(),
            ttl,
        }
    }

    /// Whether the entry may still be served at `now`.
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

/// In-memory cache shared by every controller built from one `Backend`.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let entry = self.entries.get(key)?;
        if entry.is_fresh_at(now) {
            Some(entry.payload.clone())
        } else {
            tracing::trace!(cache_key = key, "cache entry expired");
            None
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) {
        self.entries
            .insert(key.to_owned(), CacheEntry::new(value, ttl));
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

/// A cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl ResponseCache for NoopCache {
    fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    fn set(&self, _key: &str, _value: Value, _ttl: Duration) {}

    fn remove(&self, _key: &str) {}
}
