//! Private per-wrapper cache store
//!
//! Each memoizing wrapper owns exactly one [`Store`]: created empty at
//! construction, dropped with the wrapper, never shared between wrappers.
//! Expiry is lazy and timer-free: entries carry the timestamp they were
//! stored at, and validity is decided by comparing against the clock at
//! lookup time. An expired entry stays resident until the next call with
//! the same key overwrites it, or a caller-driven purge removes it.

use crate::clock::Clock;
use crate::stats::CacheStats;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Entry validity window for a wrapper's cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Entries never expire (cache-once semantics)
    Never,
    /// Entries are valid strictly while `now - stored_at < millis`
    Millis(i64),
}

impl Ttl {
    /// Normalize a raw timeout: a non-positive value means "never expires",
    /// never "always expire"
    pub fn from_millis(timeout_ms: i64) -> Self {
        if timeout_ms > 0 {
            Self::Millis(timeout_ms)
        } else {
            Self::Never
        }
    }
}

/// Expiry sentinel stored with each entry.
///
/// Modeled as an explicit state rather than a numeric infinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expiry {
    /// Entry never expires
    Never,
    /// Entry stored at this timestamp (milliseconds since the Unix epoch)
    StoredAt(i64),
}

/// A cached computation result. The entry owns its result; callers get
/// clones.
#[derive(Debug, Clone)]
struct CacheEntry<R> {
    result: R,
    stored: Expiry,
}

/// Mutex-guarded map with lazy expiry, owned by one wrapper
pub(crate) struct Store<R> {
    entries: Mutex<HashMap<String, CacheEntry<R>>>,
    ttl: Ttl,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<R: Clone> Store<R> {
    pub(crate) fn new(ttl: Ttl, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Replace the clock. Intended for wrapper construction, before any
    /// entries exist.
    pub(crate) fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    pub(crate) fn ttl(&self) -> Ttl {
        self.ttl
    }

    /// Look up a live entry, counting the outcome as a hit or miss.
    ///
    /// Expired entries are treated as absent but left resident.
    pub(crate) fn lookup(&self, key: &str) -> Option<R> {
        let found = {
            let entries = self.guard();
            entries.get(key).and_then(|entry| {
                if self.is_live(entry) {
                    Some(entry.result.clone())
                } else {
                    None
                }
            })
        };

        match found {
            Some(result) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(key, "cache hit");
                Some(result)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(key, "cache miss");
                None
            }
        }
    }

    /// Insert or overwrite the entry for `key`. At most one entry exists per
    /// key at any time.
    pub(crate) fn store(&self, key: String, result: R) {
        let stored = match self.ttl {
            Ttl::Never => Expiry::Never,
            Ttl::Millis(_) => Expiry::StoredAt(self.clock.now_millis()),
        };

        self.guard().insert(key, CacheEntry { result, stored });
    }

    /// Remove currently expired entries, returning how many were removed
    pub(crate) fn purge_expired(&self) -> usize {
        let mut entries = self.guard();
        let before = entries.len();
        entries.retain(|_, entry| self.is_live(entry));
        before - entries.len()
    }

    /// Drop all entries
    pub(crate) fn clear(&self) {
        self.guard().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.guard().len()
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats::new(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.len(),
        )
    }

    fn is_live(&self, entry: &CacheEntry<R>) -> bool {
        match (self.ttl, entry.stored) {
            (Ttl::Never, Expiry::Never) => true,
            (Ttl::Millis(ttl), Expiry::StoredAt(stored_at)) => {
                // Strict comparison: an entry is stale the instant the
                // window elapses
                self.clock.now_millis() - stored_at < ttl
            }
            // A wrapper only writes the shape matching its own TTL; any
            // mismatch is treated as stale
            _ => false,
        }
    }

    /// The store must stay usable even if a holder of the guard panicked;
    /// entries are only ever whole values, so the map cannot be observed
    /// mid-update.
    fn guard(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<R>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R> fmt::Debug for Store<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("ttl", &self.ttl)
            .field(
                "entries",
                &self.entries.lock().map(|e| e.len()).unwrap_or(0),
            )
            .finish()
    }
}
