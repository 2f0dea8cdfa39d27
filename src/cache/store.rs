//! TTL response store.
//!
//! Values are held behind `Arc` and handed out without copying: two `get`s of
//! the same key observe the same allocation. Expiry is checked lazily on every
//! `get`; the background sweep only reclaims memory.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

use super::key::CacheKey;

const EXPIRY_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug)]
struct Entry<V> {
    value: Arc<V>,
    /// `None` = never expires.
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Hit/miss counters plus the current number of stored keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub keys: usize,
}

/// In-memory TTL store shared by every tool.
#[derive(Debug)]
pub struct ResponseCache<V> {
    entries: Mutex<HashMap<CacheKey, Entry<V>>>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    expired_tx: broadcast::Sender<CacheKey>,
}

impl<V> ResponseCache<V> {
    /// Create a store with a default TTL in seconds (0 = never expires).
    pub fn new(default_ttl_secs: u64) -> Self {
        let (expired_tx, _) = broadcast::channel(EXPIRY_CHANNEL_CAPACITY);
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl: Duration::from_secs(default_ttl_secs),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired_tx,
        }
    }

    /// Store-wide default TTL.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up a live entry. Expired entries are removed and reported.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<V>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let expired = match entries.get(key) {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Some(entry) if !entry.is_expired(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(Arc::clone(&entry.value));
            }
            Some(_) => true,
        };

        if expired {
            entries.remove(key);
            drop(entries);
            self.notify_expired(key.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a value. `ttl` overrides the default for this entry only.
    ///
    /// Returns the stored handle so callers can hand out the same allocation
    /// later `get`s will see.
    pub fn set(&self, key: CacheKey, value: V, ttl: Option<Duration>) -> Arc<V> {
        let value = Arc::new(value);
        let ttl = ttl.unwrap_or(self.default_ttl);
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };

        self.entries.lock().insert(
            key,
            Entry {
                value: Arc::clone(&value),
                expires_at,
            },
        );
        value
    }

    /// Remove one key. Returns whether it was present.
    pub fn del(&self, key: &CacheKey) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Remove every key.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored keys, including not-yet-reclaimed expired ones.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            keys: self.len(),
        }
    }

    /// Reclaim all expired entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let removed: Vec<CacheKey> = {
            let mut entries = self.entries.lock();
            let expired: Vec<CacheKey> = entries
                .iter()
                .filter(|(_, entry)| entry.is_expired(now))
                .map(|(key, _)| key.clone())
                .collect();
            for key in &expired {
                entries.remove(key);
            }
            expired
        };

        let count = removed.len();
        for key in removed {
            self.notify_expired(key);
        }
        count
    }

    /// Subscribe to keys removed because their TTL elapsed.
    pub fn subscribe_expired(&self) -> broadcast::Receiver<CacheKey> {
        self.expired_tx.subscribe()
    }

    fn notify_expired(&self, key: CacheKey) {
        tracing::debug!(key = %key, "cache key expired");
        // No subscribers is the common case.
        let _ = self.expired_tx.send(key);
    }
}
