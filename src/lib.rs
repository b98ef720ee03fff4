//! # memocache
//!
//! Function-result memoization with lazy, timer-free TTL expiry.
//!
//! Wrap any computation function and get back a caching wrapper that keys
//! results by a derived string identity of the call arguments and
//! transparently recomputes once a per-entry time-to-live has elapsed. No
//! background timers: validity is a timestamp comparison at lookup time.
//!
//! ## Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`derive_key`] | Stable string identity for arbitrary structured key material |
//! | [`Memoized`] / [`memoize`] | Caching wrapper around an infallible function |
//! | [`TryMemoized`] / [`try_memoize`] | Fallible variant; errors propagate and are never cached |
//! | [`Clock`] / [`ManualClock`] | Injectable time source for deterministic tests |
//! | [`CacheStats`] | Hit/miss counters per wrapper |
//!
//! ## Example
//!
//! ```rust
//! use memocache::memoize_with_ttl;
//!
//! let lookup = memoize_with_ttl(|user_id: &u64| format!("profile-{user_id}"), 5_000);
//!
//! let first = lookup.call(7);
//! let second = lookup.call(7); // served from cache for 5 seconds
//! assert_eq!(first, second);
//! ```
//!
//! ## Semantics worth knowing
//!
//! - A non-positive TTL means entries never expire, not "always expire".
//! - Each wrapper owns a private cache; wrapping the same function twice
//!   yields fully isolated caches.
//! - Map-typed key material keeps its native key order when deriving keys,
//!   so structurally equal maps with different insertion orders may derive
//!   different keys. Documented imprecision, not a defect.
//! - Expired entries stay resident until overwritten by the next call with
//!   their key or removed by [`Memoized::purge_expired`]. Accepted
//!   memory-growth tradeoff of the timer-free design.

pub mod clock;
pub mod error;
pub mod key;
pub mod memoize;
pub mod stats;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use key::{FALLBACK_KEY, derive_key, try_derive_key};
pub use memoize::{
    Memoized, TryMemoized, memoize, memoize_with, memoize_with_ttl, try_memoize, try_memoize_with,
    try_memoize_with_ttl,
};
pub use stats::CacheStats;
pub use store::Ttl;
