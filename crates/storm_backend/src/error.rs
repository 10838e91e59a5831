//! Error types for backend operations.

use std::io;
use storm_codec::CodecError;
use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur during backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No entity is stored under the key.
    #[error("entity not found: {key}")]
    NotFound {
        /// The key that was looked up.
        key: String,
    },

    /// The cache holds no entry for the key.
    #[error("cache miss: {key}")]
    CacheMiss {
        /// The cache key that was looked up.
        key: String,
    },

    /// The context was cancelled before the call ran.
    #[error("context cancelled")]
    Cancelled,

    /// The context deadline passed before the call ran.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Stored bytes could not be decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The stored data is corrupted.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// The backend cannot serve requests right now.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Creates a not-found error for a key.
    pub fn not_found(key: impl ToString) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }

    /// Creates a cache-miss error for a cache key.
    pub fn cache_miss(key: impl Into<String>) -> Self {
        Self::CacheMiss { key: key.into() }
    }

    /// Returns true if the durable store has no entity for the key.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the cache has no entry for the key.
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, Self::CacheMiss { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Key;

    #[test]
    fn not_found_display_names_key() {
        let err = BackendError::not_found(Key::new("Note", "abc"));
        assert_eq!(err.to_string(), "entity not found: Note/abc");
        assert!(err.is_not_found());
        assert!(!err.is_cache_miss());
    }

    #[test]
    fn cache_miss_is_distinguishable() {
        let err = BackendError::cache_miss("model.Note.abc");
        assert!(err.is_cache_miss());
        assert!(!err.is_not_found());
    }
}
