//! Memoizing wrapper factory
//!
//! Wraps a computation function in a caching layer keyed by a derived string
//! identity of the call arguments. Each wrapper owns a private store;
//! wrapping the same function twice yields two wrappers that never share
//! cached state.
//!
//! ## Invocation protocol
//!
//! 1. The resolver (or the collected arguments) is turned into a string key
//!    by [`derive_key`]. The resolver runs on every call, hit or miss, and
//!    is never itself cached, so it must be cheap.
//! 2. A live entry under that key is returned without invoking the wrapped
//!    function.
//! 3. Otherwise the function runs, its result is stored (overwriting any
//!    stale entry for the key) and returned.
//!
//! Expiry is lazy: no background timers, no scheduled eviction. Validity is
//! a timestamp comparison at lookup time, so an expired entry occupies the
//! store until the next call with its key or an explicit
//! [`purge_expired`](Memoized::purge_expired).
//!
//! The compute step runs outside the store lock. Under concurrent use two
//! callers may both miss and both compute; the later store overwrites,
//! which matches the overwrite-on-recompute semantics. The TTL governs
//! entry validity only, never execution deadlines of the wrapped function.

use crate::clock::{Clock, SystemClock};
use crate::key::derive_key;
use crate::stats::CacheStats;
use crate::store::{Store, Ttl};
use serde::Serialize;
use std::sync::Arc;

/// Derives the cache key for one invocation's arguments
type KeyFn<A> = Box<dyn Fn(&A) -> String + Send + Sync>;

fn resolver_key_fn<A, V, S>(resolver: S) -> KeyFn<A>
where
    A: 'static,
    S: Fn(&A) -> V + Send + Sync + 'static,
    V: Serialize + 'static,
{
    Box::new(move |args: &A| derive_key(&resolver(args)))
}

/// Memoize `func` with cache-once semantics: entries never expire.
///
/// Arguments key the cache directly (the default resolver collects them
/// unchanged). Multi-argument functions take a tuple.
///
/// # Example
///
/// ```rust
/// use memocache::memoize;
///
/// let double = memoize(|n: &u64| n * 2);
/// assert_eq!(double.call(21), 42);
/// assert_eq!(double.call(21), 42); // cached; the closure did not rerun
/// ```
pub fn memoize<A, R, F>(func: F) -> Memoized<A, R, F>
where
    A: Serialize + 'static,
    R: Clone,
    F: Fn(&A) -> R,
{
    Memoized::new(func)
}

/// Memoize `func` with a time-to-live in milliseconds.
///
/// A non-positive `timeout_ms` means entries never expire; a positive one
/// keeps an entry valid strictly while `now - stored_at < timeout_ms`.
pub fn memoize_with_ttl<A, R, F>(func: F, timeout_ms: i64) -> Memoized<A, R, F>
where
    A: Serialize + 'static,
    R: Clone,
    F: Fn(&A) -> R,
{
    Memoized::with_ttl(func, timeout_ms)
}

/// Memoize `func` with a custom key resolver and a time-to-live.
///
/// The resolver is called with the exact arguments of every invocation and
/// its output is fed to [`derive_key`]; a string output is used verbatim as
/// the key.
pub fn memoize_with<A, V, R, F, S>(func: F, resolver: S, timeout_ms: i64) -> Memoized<A, R, F>
where
    A: 'static,
    R: Clone,
    F: Fn(&A) -> R,
    S: Fn(&A) -> V + Send + Sync + 'static,
    V: Serialize + 'static,
{
    Memoized::with_resolver(func, resolver, timeout_ms)
}

/// Memoize a fallible `func` with cache-once semantics.
///
/// Only `Ok` results are cached; see [`TryMemoized`].
pub fn try_memoize<A, T, E, F>(func: F) -> TryMemoized<A, T, E, F>
where
    A: Serialize + 'static,
    T: Clone,
    F: Fn(&A) -> Result<T, E>,
{
    TryMemoized::new(func)
}

/// Memoize a fallible `func` with a time-to-live in milliseconds
pub fn try_memoize_with_ttl<A, T, E, F>(func: F, timeout_ms: i64) -> TryMemoized<A, T, E, F>
where
    A: Serialize + 'static,
    T: Clone,
    F: Fn(&A) -> Result<T, E>,
{
    TryMemoized::with_ttl(func, timeout_ms)
}

/// Memoize a fallible `func` with a custom key resolver and a time-to-live
pub fn try_memoize_with<A, V, T, E, F, S>(
    func: F,
    resolver: S,
    timeout_ms: i64,
) -> TryMemoized<A, T, E, F>
where
    A: 'static,
    T: Clone,
    F: Fn(&A) -> Result<T, E>,
    S: Fn(&A) -> V + Send + Sync + 'static,
    V: Serialize + 'static,
{
    TryMemoized::with_resolver(func, resolver, timeout_ms)
}

/// Caching wrapper around an infallible computation function.
///
/// Owns a private, mutex-guarded cache mapping derived string keys to
/// results. Construction allocates the empty cache and nothing else; the
/// cache lives exactly as long as the wrapper.
pub struct Memoized<A, R, F> {
    func: F,
    key_fn: KeyFn<A>,
    store: Store<R>,
}

impl<A, R, F> Memoized<A, R, F>
where
    A: 'static,
    R: Clone,
    F: Fn(&A) -> R,
{
    /// Wrap `func` with cache-once semantics and the default resolver
    pub fn new(func: F) -> Self
    where
        A: Serialize,
    {
        Self::with_ttl(func, 0)
    }

    /// Wrap `func` with a time-to-live in milliseconds (non-positive means
    /// never expires) and the default resolver
    pub fn with_ttl(func: F, timeout_ms: i64) -> Self
    where
        A: Serialize,
    {
        Self::from_parts(func, Box::new(|args: &A| derive_key(args)), timeout_ms)
    }

    /// Wrap `func` with a custom key resolver.
    ///
    /// Lifts the `Serialize` requirement from the argument type: only the
    /// resolver's output must serialize.
    pub fn with_resolver<V, S>(func: F, resolver: S, timeout_ms: i64) -> Self
    where
        S: Fn(&A) -> V + Send + Sync + 'static,
        V: Serialize + 'static,
    {
        Self::from_parts(func, resolver_key_fn(resolver), timeout_ms)
    }

    fn from_parts(func: F, key_fn: KeyFn<A>, timeout_ms: i64) -> Self {
        Self {
            func,
            key_fn,
            store: Store::new(Ttl::from_millis(timeout_ms), Arc::new(SystemClock)),
        }
    }

    /// Swap the time source, e.g. for a [`ManualClock`](crate::ManualClock)
    /// in tests. Intended for construction time, before any entries exist.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.store.set_clock(clock);
        self
    }

    /// Invoke the wrapped function through the cache.
    ///
    /// On a live entry the function is not invoked at all (observable by
    /// call counting). On a miss the function runs synchronously, its result
    /// overwrites the entry for the key, and the result is returned. A panic
    /// in the resolver or the function propagates unchanged and writes no
    /// entry.
    pub fn call(&self, args: A) -> R {
        let key = (self.key_fn)(&args);
        if let Some(result) = self.store.lookup(&key) {
            return result;
        }

        // Outside the store lock: a panic here leaves the cache unmodified
        // and the mutex unpoisoned
        let result = (self.func)(&args);
        self.store.store(key, result.clone());
        result
    }

    /// The wrapper's validity window
    pub fn ttl(&self) -> Ttl {
        self.store.ttl()
    }

    /// Number of resident entries, including expired ones not yet
    /// overwritten or purged
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.store.len() == 0
    }

    /// Remove currently expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }

    /// Drop all cached entries
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Hit/miss counters and entry count for this wrapper
    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }
}

impl<A, R, F> std::fmt::Debug for Memoized<A, R, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memoized").field("store", &self.store).finish()
    }
}

/// Caching wrapper around a fallible computation function.
///
/// Identical protocol to [`Memoized`], except that an `Err` from the
/// function propagates unchanged and writes no cache entry: a later call
/// with the same key retries the function instead of replaying the failure.
pub struct TryMemoized<A, T, E, F> {
    func: F,
    key_fn: KeyFn<A>,
    store: Store<T>,
    _marker: std::marker::PhantomData<fn() -> E>,
}

impl<A, T, E, F> TryMemoized<A, T, E, F>
where
    A: 'static,
    T: Clone,
    F: Fn(&A) -> Result<T, E>,
{
    /// Wrap `func` with cache-once semantics and the default resolver
    pub fn new(func: F) -> Self
    where
        A: Serialize,
    {
        Self::with_ttl(func, 0)
    }

    /// Wrap `func` with a time-to-live in milliseconds (non-positive means
    /// never expires) and the default resolver
    pub fn with_ttl(func: F, timeout_ms: i64) -> Self
    where
        A: Serialize,
    {
        Self::from_parts(func, Box::new(|args: &A| derive_key(args)), timeout_ms)
    }

    /// Wrap `func` with a custom key resolver
    pub fn with_resolver<V, S>(func: F, resolver: S, timeout_ms: i64) -> Self
    where
        S: Fn(&A) -> V + Send + Sync + 'static,
        V: Serialize + 'static,
    {
        Self::from_parts(func, resolver_key_fn(resolver), timeout_ms)
    }

    fn from_parts(func: F, key_fn: KeyFn<A>, timeout_ms: i64) -> Self {
        Self {
            func,
            key_fn,
            store: Store::new(Ttl::from_millis(timeout_ms), Arc::new(SystemClock)),
            _marker: std::marker::PhantomData,
        }
    }

    /// Swap the time source. Intended for construction time, before any
    /// entries exist.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.store.set_clock(clock);
        self
    }

    /// Invoke the wrapped function through the cache.
    ///
    /// Only `Ok` results are cached. An `Err` is returned as-is and the
    /// entry for the key is left untouched, so the next call retries.
    pub fn call(&self, args: A) -> Result<T, E> {
        let key = (self.key_fn)(&args);
        if let Some(value) = self.store.lookup(&key) {
            return Ok(value);
        }

        let value = (self.func)(&args)?;
        self.store.store(key, value.clone());
        Ok(value)
    }

    /// The wrapper's validity window
    pub fn ttl(&self) -> Ttl {
        self.store.ttl()
    }

    /// Number of resident entries, including expired ones not yet
    /// overwritten or purged
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.store.len() == 0
    }

    /// Remove currently expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }

    /// Drop all cached entries
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Hit/miss counters and entry count for this wrapper
    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }
}

impl<A, T, E, F> std::fmt::Debug for TryMemoized<A, T, E, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TryMemoized")
            .field("store", &self.store)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_hit_does_not_invoke_function() {
        let calls = Arc::new(AtomicU32::new(0));
        let counted = calls.clone();
        let memoized = memoize(move |n: &u32| {
            counted.fetch_add(1, Ordering::SeqCst);
            n * 2
        });

        assert_eq!(memoized.call(5), 10);
        assert_eq!(memoized.call(5), 10);
        assert_eq!(memoized.call(5), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // A different key still computes
        assert_eq!(memoized.call(6), 12);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_wrappers_never_share_caches() {
        let value = Arc::new(AtomicU32::new(1));

        let v = value.clone();
        let first = memoize(move |(): &()| v.load(Ordering::SeqCst));
        let v = value.clone();
        let second = memoize(move |(): &()| v.load(Ordering::SeqCst));

        assert_eq!(first.call(()), 1);
        value.store(2, Ordering::SeqCst);

        // Populating `first` must not cause a hit on `second`
        assert_eq!(second.call(()), 2);
        assert_eq!(first.call(()), 1);
    }

    #[test]
    fn test_entry_expires_exactly_at_ttl() {
        let clock = ManualClock::shared(0);
        let calls = Arc::new(AtomicU32::new(0));
        let counted = calls.clone();
        let memoized = memoize_with_ttl(
            move |(): &()| counted.fetch_add(1, Ordering::SeqCst),
            1_000,
        )
        .with_clock(clock.clone());

        memoized.call(());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.set(999);
        memoized.call(());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.set(1_000);
        memoized.call(());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_timeout_caches_forever() {
        let clock = ManualClock::shared(0);
        let calls = Arc::new(AtomicU32::new(0));
        let counted = calls.clone();
        let memoized = memoize_with_ttl(
            move |(): &()| counted.fetch_add(1, Ordering::SeqCst),
            0,
        )
        .with_clock(clock.clone());

        memoized.call(());
        clock.set(i64::MAX);
        memoized.call(());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_negative_timeout_normalizes_to_never() {
        let memoized = memoize_with_ttl(|n: &u32| *n, -5);
        assert_eq!(memoized.ttl(), Ttl::Never);
    }

    #[test]
    fn test_resolver_collapses_keys() {
        let calls = Arc::new(AtomicU32::new(0));
        let counted = calls.clone();
        let memoized = memoize_with(
            move |i: &u32| {
                counted.fetch_add(1, Ordering::SeqCst);
                *i
            },
            |i: &u32| if i % 2 == 0 { "foo" } else { "bar" },
            0,
        );

        // All even arguments collide on one entry, all odd on another
        assert_eq!(memoized.call(2), 2);
        assert_eq!(memoized.call(4), 2);
        assert_eq!(memoized.call(100), 2);
        assert_eq!(memoized.call(3), 3);
        assert_eq!(memoized.call(7), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(memoized.len(), 2);
    }

    #[test]
    fn test_resolver_runs_on_every_call() {
        let resolver_calls = Arc::new(AtomicU32::new(0));
        let counted = resolver_calls.clone();
        let memoized = memoize_with(
            |n: &u32| *n,
            move |n: &u32| {
                counted.fetch_add(1, Ordering::SeqCst);
                *n
            },
            0,
        );

        memoized.call(1);
        memoized.call(1);
        memoized.call(1);
        assert_eq!(resolver_calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_error_is_not_cached() {
        let calls = Arc::new(AtomicU32::new(0));
        let counted = calls.clone();
        let memoized = try_memoize(move |(): &()| {
            let n = counted.fetch_add(1, Ordering::SeqCst);
            if n == 0 { Err("boom") } else { Ok(n) }
        });

        assert_eq!(memoized.call(()), Err("boom"));
        // The failure left the cache empty for the key
        assert!(memoized.is_empty());

        // The next call retries instead of replaying the error
        assert_eq!(memoized.call(()), Ok(1));
        assert_eq!(memoized.call(()), Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_ok_results_are_cached() {
        let calls = Arc::new(AtomicU32::new(0));
        let counted = calls.clone();
        let memoized = try_memoize_with_ttl(
            move |n: &u32| -> Result<u32, String> {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok(n + 1)
            },
            0,
        );

        assert_eq!(memoized.call(1), Ok(2));
        assert_eq!(memoized.call(1), Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tuple_arguments_key_in_order() {
        let memoized = memoize(|(a, b): &(u32, String)| format!("{a}-{b}"));
        assert_eq!(memoized.call((1, "x".to_string())), "1-x");
        assert_eq!(memoized.call((1, "x".to_string())), "1-x");
        assert_eq!(memoized.len(), 1);

        assert_eq!(memoized.call((2, "x".to_string())), "2-x");
        assert_eq!(memoized.len(), 2);
    }

    #[test]
    fn test_stats_and_clear() {
        let memoized = memoize(|n: &u32| *n);
        memoized.call(1);
        memoized.call(1);
        memoized.call(2);

        let stats = memoized.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entries, 2);

        memoized.clear();
        assert!(memoized.is_empty());
        memoized.call(1);
        assert_eq!(memoized.stats().misses, 3);
    }

    #[test]
    fn test_wrapper_is_shareable_across_threads() {
        let memoized = Arc::new(memoize(|n: &u64| n * 3));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let memoized = memoized.clone();
                std::thread::spawn(move || {
                    for n in 0..16_u64 {
                        assert_eq!(memoized.call(n), n * 3);
                    }
                })
            })
            .collect();

        for handle in handles {
            if let Err(panic) = handle.join() {
                std::panic::resume_unwind(panic);
            }
        }

        assert_eq!(memoized.len(), 16);
    }
}
