//! Durable store trait definition.

use crate::context::Context;
use crate::error::BackendResult;
use crate::key::Key;
use crate::query::QueryDescriptor;

/// The authoritative store for encoded records.
///
/// # Invariants
///
/// - `get` returns exactly the bytes last written by `put` for the key
/// - `get` and `delete` on an absent key fail with
///   [`crate::BackendError::NotFound`]
/// - Every method checks the context before touching data
/// - Implementations must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`crate::InMemoryStore`] - for testing
/// - [`crate::FileStore`] - for persistent storage
pub trait DurableStore: Send + Sync {
    /// Reads the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing is stored under the key, or the
    /// context error if the context is done.
    fn get(&self, ctx: &Context, key: &Key) -> BackendResult<Vec<u8>>;

    /// Stores `data` under `key`, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the context is done.
    fn put(&self, ctx: &Context, key: &Key, data: &[u8]) -> BackendResult<()>;

    /// Removes the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing is stored under the key.
    fn delete(&self, ctx: &Context, key: &Key) -> BackendResult<()>;

    /// Enumerates the records of `query.kind` matching the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be read or decoded.
    fn query(&self, ctx: &Context, query: &QueryDescriptor) -> BackendResult<Vec<(Key, Vec<u8>)>>;

    /// Counts the records matching the query.
    ///
    /// # Errors
    ///
    /// Same as [`DurableStore::query`].
    fn count(&self, ctx: &Context, query: &QueryDescriptor) -> BackendResult<usize> {
        Ok(self.query(ctx, query)?.len())
    }
}
