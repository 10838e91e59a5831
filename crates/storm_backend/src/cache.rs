//! Cache store trait definition.

use crate::context::Context;
use crate::error::BackendResult;
use std::time::Duration;

/// A fast, lossy layer in front of the durable store.
///
/// The cache may drop entries at any time; a missing entry is reported as
/// [`crate::BackendError::CacheMiss`] so callers can tell it apart from a
/// real failure.
pub trait CacheStore: Send + Sync {
    /// Reads the entry stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `CacheMiss` if there is no live entry for the key.
    fn get(&self, ctx: &Context, key: &str) -> BackendResult<Vec<u8>>;

    /// Stores `data` under `key`. `None` means the entry never expires.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache rejects the write or the context is done.
    fn set(&self, ctx: &Context, key: &str, data: &[u8], ttl: Option<Duration>) -> BackendResult<()>;

    /// Removes the entry stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `CacheMiss` if there is no live entry for the key.
    fn delete(&self, ctx: &Context, key: &str) -> BackendResult<()>;
}
