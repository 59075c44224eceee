//! Response caching: deterministic keys and LRU + TTL stores.
//!
//! The gateway keeps one [`ResponseCache`] per operation, grouped in a
//! [`CacheSet`] that is built once at startup and shared through `Arc`.

pub mod key;
pub mod response_cache;

use serde::Serialize;

pub use key::{build_key, short_key};
pub use response_cache::{CacheEntry, CacheStats, Clock, ManualClock, ResponseCache, SystemClock};

use crate::config::CacheConfig;
use crate::error::Result;
use crate::normalize::{ExplainResponse, RefactorResponse, TestResponse};

/// The three per-operation caches.
pub struct CacheSet {
    pub explain: ResponseCache<ExplainResponse>,
    pub tests: ResponseCache<TestResponse>,
    pub refactor: ResponseCache<RefactorResponse>,
}

/// Statistics of every cache, keyed the way `/cache/stats` reports them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheSetStats {
    pub explain: CacheStats,
    pub test: CacheStats,
    pub refactor: CacheStats,
}

/// Current entry count of every cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheSizes {
    pub explain: usize,
    pub test: usize,
    pub refactor: usize,
}

impl CacheSet {
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Ok(Self {
            explain: ResponseCache::new(config.explain.max_size, config.explain.ttl_secs)?,
            tests: ResponseCache::new(config.tests.max_size, config.tests.ttl_secs)?,
            refactor: ResponseCache::new(config.refactor.max_size, config.refactor.ttl_secs)?,
        })
    }

    pub fn stats(&self) -> CacheSetStats {
        CacheSetStats {
            explain: self.explain.stats(),
            test: self.tests.stats(),
            refactor: self.refactor.stats(),
        }
    }

    pub fn sizes(&self) -> CacheSizes {
        CacheSizes {
            explain: self.explain.size(),
            test: self.tests.size(),
            refactor: self.refactor.size(),
        }
    }

    /// Empty every cache and reset its counters.
    pub fn clear_all(&self) {
        self.explain.clear();
        self.tests.clear();
        self.refactor.clear();
    }
}
