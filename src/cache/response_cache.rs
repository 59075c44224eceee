//! Response cache with TTL expiry and LRU eviction.
//!
//! Values are stored per cache key (see [`super::key::build_key`]). Entries
//! expire once older than the configured TTL and are evicted least recently
//! used first when the store reaches capacity. Expired entries are swept
//! lazily on `get` and `set`.
//!
//! Every operation takes a single mutex for its whole body, so operations are
//! linearizable with respect to each other. None of them calls another while
//! holding the lock. Reads hand out clones: a caller that attaches request
//! metadata to a returned value never touches the stored copy.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use lru::LruCache;
use serde::Serialize;
use tracing::debug;

use super::key::short_key;
use crate::error::{ExplainerError, Result};

/// Source of "now" for entry timestamps, in seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

/// Hand-driven clock for deterministic expiry.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: f64) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, secs: f64) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) += secs;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A single cached value.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Seconds since the Unix epoch when the value was stored.
    pub timestamp: f64,
    pub value: V,
}

struct CacheState<V> {
    entries: LruCache<String, CacheEntry<V>>,
    hits: u64,
    misses: u64,
}

/// Thread-safe LRU + TTL cache of validated responses.
pub struct ResponseCache<V> {
    state: Mutex<CacheState<V>>,
    max_size: usize,
    ttl_secs: u64,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> ResponseCache<V> {
    /// Create a cache bounded to `max_size` entries, each living `ttl_secs`.
    ///
    /// Both bounds must be at least 1.
    pub fn new(max_size: usize, ttl_secs: u64) -> Result<Self> {
        Self::with_clock(max_size, ttl_secs, Arc::new(SystemClock))
    }

    /// Same as [`ResponseCache::new`] with an explicit time source.
    pub fn with_clock(max_size: usize, ttl_secs: u64, clock: Arc<dyn Clock>) -> Result<Self> {
        let capacity = NonZeroUsize::new(max_size).ok_or_else(|| {
            ExplainerError::InvalidConfiguration("max_size must be at least 1".into())
        })?;
        if ttl_secs < 1 {
            return Err(ExplainerError::InvalidConfiguration(
                "ttl_seconds must be at least 1".into(),
            ));
        }
        Ok(Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
            }),
            max_size,
            ttl_secs,
            clock,
        })
    }

    /// Look up a value. Returns `None` if the key is absent or expired.
    ///
    /// A hit moves the entry to the most-recently-used position.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut state = self.lock();
        self.evict_expired(&mut state, now);

        let value = state.entries.get(key).map(|entry| entry.value.clone());
        match value {
            Some(v) => {
                state.hits += 1;
                Some(v)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Store a value at the most-recently-used position.
    ///
    /// Replacing an existing key refreshes its timestamp. A new key at
    /// capacity evicts the least recently used entry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = self.clock.now();
        let mut state = self.lock();
        self.evict_expired(&mut state, now);

        let entry = CacheEntry {
            timestamp: now,
            value,
        };
        if let Some((evicted, _)) = state.entries.push(key.clone(), entry) {
            if evicted != key {
                debug!(key = %short_key(&evicted), "Evicting LRU cache entry");
            }
        }
    }

    /// Remove a key. Returns whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.lock().entries.pop(key).is_some()
    }

    /// Remove all entries and reset the hit/miss counters.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.hits = 0;
        state.misses = 0;
    }

    /// Number of stored entries, possibly including not-yet-swept expired ones.
    pub fn size(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let total = state.hits + state.misses;
        let hit_rate = if total > 0 {
            (state.hits as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
        } else {
            0.0
        };
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            total_requests: total,
            hit_rate_percent: hit_rate,
            current_size: state.entries.len(),
            max_size: self.max_size,
            ttl_seconds: self.ttl_secs,
        }
    }

    // -- private helpers ---------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, CacheState<V>> {
        // Every mutation leaves the state consistent, so a poisoned lock is safe to reuse.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evict_expired(&self, state: &mut CacheState<V>, now: f64) {
        let ttl = self.ttl_secs as f64;
        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, e)| now - e.timestamp > ttl)
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            debug!(key = %short_key(&key), "Cache entry expired, removing");
            state.entries.pop(&key);
        }
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub total_requests: u64,
    /// `100 * hits / total_requests`, rounded to two decimals; 0 before any request.
    pub hit_rate_percent: f64,
    pub current_size: usize,
    pub max_size: usize,
    pub ttl_seconds: u64,
}
