//! Cache key derivation
//!
//! Converts arbitrary key material (a resolver's output, or the call
//! arguments themselves) into a stable string identity suitable for use as a
//! map key.
//!
//! ## Derivation rules
//!
//! - Material that serializes to a JSON string is used verbatim: string
//!   resolver outputs are literal keys, not JSON-encoded primitives, so
//!   `"foo"` derives `foo` (unquoted).
//! - Everything else renders as compact JSON: `null`, `true`, `13`,
//!   `[13,"foo","bar"]`, `{"k1":v1,"k2":v2}`. Sequences keep element order;
//!   maps keep their native key enumeration order (not sorted), so two
//!   structurally equal maps with different insertion orders may derive
//!   different keys. That imprecision is accepted, not a defect.
//! - Material with no structural representation derives the literal
//!   [`FALLBACK_KEY`] instead of failing. Best-effort and non-unique: all
//!   such values share one key.
//!
//! Identical material (same structure, same key order) always derives the
//! same string within a process run.

use crate::error::Result;
use serde::Serialize;
use serde_json::Value;

/// Key derived for material that cannot be structurally serialized
pub const FALLBACK_KEY: &str = "undefined";

/// Derive a stable string key from arbitrary key material.
///
/// Pure, total and side-effect-free: serialization failures fall back to
/// [`FALLBACK_KEY`] rather than propagating.
///
/// # Example
///
/// ```rust
/// use memocache::derive_key;
/// use serde_json::json;
///
/// assert_eq!(derive_key(&13), "13");
/// assert_eq!(derive_key(&"foo"), "foo");
/// assert_eq!(derive_key(&json!([13, "foo", "bar"])), "[13,\"foo\",\"bar\"]");
/// ```
pub fn derive_key<T: Serialize>(value: &T) -> String {
    match try_derive_key(value) {
        Ok(key) => key,
        Err(err) => {
            tracing::debug!("Key material not serializable, using fallback key: {}", err);
            FALLBACK_KEY.to_string()
        }
    }
}

/// Derive a key, surfacing serialization failure instead of falling back.
///
/// Same derivation rules as [`derive_key`]; returns
/// [`Error::KeyDerivation`](crate::Error::KeyDerivation) where `derive_key`
/// would return [`FALLBACK_KEY`].
pub fn try_derive_key<T: Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        // Strings pass through verbatim
        Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}
