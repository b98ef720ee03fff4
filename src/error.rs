//! Error handling types

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for memocache
#[derive(Error, Debug)]
pub enum Error {
    /// Key material could not be structurally serialized
    #[error("Key derivation error: {source}")]
    KeyDerivation {
        /// The underlying serialization error
        #[from]
        source: serde_json::Error,
    },
}

impl Error {
    /// Create a key derivation error
    pub fn key_derivation(source: serde_json::Error) -> Self {
        Self::KeyDerivation { source }
    }
}
