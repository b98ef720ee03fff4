//! Cache statistics
//!
//! Point-in-time counters for one wrapper's private cache.

use serde::{Deserialize, Serialize};

/// Statistics snapshot for a single memoizing wrapper
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the cache without invoking the function
    pub hits: u64,
    /// Lookups that fell through to the wrapped function
    pub misses: u64,
    /// Entries currently resident, including expired entries not yet
    /// overwritten or purged
    pub entries: usize,
    /// Cache hit ratio (0.0 to 1.0)
    pub hit_ratio: f64,
}

impl CacheStats {
    /// Build a snapshot, computing the hit ratio from the raw counters
    pub(crate) fn new(hits: u64, misses: u64, entries: usize) -> Self {
        let total = hits + misses;
        let hit_ratio = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        Self {
            hits,
            misses,
            entries,
            hit_ratio,
        }
    }
}
