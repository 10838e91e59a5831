//! In-memory backends for testing.

use crate::cache::CacheStore;
use crate::context::Context;
use crate::error::{BackendError, BackendResult};
use crate::key::Key;
use crate::query::QueryDescriptor;
use crate::store::DurableStore;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// An in-memory durable store.
///
/// This store keeps all records in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral data that doesn't need persistence
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use storm_backend::{Context, DurableStore, InMemoryStore, Key};
///
/// let store = InMemoryStore::new();
/// let ctx = Context::background();
/// store.put(&ctx, &Key::new("Note", "1"), b"data").unwrap();
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<Key, Vec<u8>>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns true if a record is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &Key) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Removes every record.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl DurableStore for InMemoryStore {
    fn get(&self, ctx: &Context, key: &Key) -> BackendResult<Vec<u8>> {
        ctx.check()?;
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| BackendError::not_found(key))
    }

    fn put(&self, ctx: &Context, key: &Key, data: &[u8]) -> BackendResult<()> {
        ctx.check()?;
        self.entries.write().insert(key.clone(), data.to_vec());
        Ok(())
    }

    fn delete(&self, ctx: &Context, key: &Key) -> BackendResult<()> {
        ctx.check()?;
        match self.entries.write().remove(key) {
            Some(_) => Ok(()),
            None => Err(BackendError::not_found(key)),
        }
    }

    fn query(&self, ctx: &Context, query: &QueryDescriptor) -> BackendResult<Vec<(Key, Vec<u8>)>> {
        ctx.check()?;
        let entries: Vec<(Key, Vec<u8>)> = self
            .entries
            .read()
            .iter()
            .filter(|(k, _)| k.kind() == query.kind)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        query.evaluate(entries)
    }
}

#[derive(Debug)]
struct CacheEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// An in-memory cache with optional per-entry expiry.
///
/// Expired entries behave exactly like missing ones and are evicted the
/// next time they are touched.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    /// Creates a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().values().filter(|e| e.is_live(now)).count()
    }

    /// Returns true if the cache holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if a live entry exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .get(key)
            .is_some_and(|e| e.is_live(Instant::now()))
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl CacheStore for InMemoryCache {
    fn get(&self, ctx: &Context, key: &str) -> BackendResult<Vec<u8>> {
        ctx.check()?;
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Ok(entry.data.clone()),
                Some(_) => {}
                None => return Err(BackendError::cache_miss(key)),
            }
        }
        self.entries.write().remove(key);
        Err(BackendError::cache_miss(key))
    }

    fn set(&self, ctx: &Context, key: &str, data: &[u8], ttl: Option<Duration>) -> BackendResult<()> {
        ctx.check()?;
        let entry = CacheEntry {
            data: data.to_vec(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, ctx: &Context, key: &str) -> BackendResult<()> {
        ctx.check()?;
        match self.entries.write().remove(key) {
            Some(entry) if entry.is_live(Instant::now()) => Ok(()),
            _ => Err(BackendError::cache_miss(key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn ctx() -> Context {
        Context::background()
    }

    #[test]
    fn store_new_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn store_put_then_get() {
        let store = InMemoryStore::new();
        let key = Key::new("Note", "1");
        store.put(&ctx(), &key, b"hello").unwrap();
        assert_eq!(store.get(&ctx(), &key).unwrap(), b"hello");
        assert!(store.contains(&key));
    }

    #[test]
    fn store_put_replaces() {
        let store = InMemoryStore::new();
        let key = Key::new("Note", "1");
        store.put(&ctx(), &key, b"old").unwrap();
        store.put(&ctx(), &key, b"new").unwrap();
        assert_eq!(store.get(&ctx(), &key).unwrap(), b"new");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_get_missing_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.get(&ctx(), &Key::new("Note", "x")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn store_delete_missing_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.delete(&ctx(), &Key::new("Note", "x")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn store_respects_cancelled_context() {
        let store = InMemoryStore::new();
        let (ctx, handle) = Context::background().with_cancel();
        handle.cancel();
        let err = store.put(&ctx, &Key::new("Note", "1"), b"x").unwrap_err();
        assert!(matches!(err, BackendError::Cancelled));
        assert!(store.is_empty());
    }

    #[test]
    fn store_query_scopes_to_kind() {
        let store = InMemoryStore::new();
        let bytes = storm_codec::to_cbor(&42i64).unwrap();
        store.put(&ctx(), &Key::new("A", "1"), &bytes).unwrap();
        store.put(&ctx(), &Key::new("B", "1"), &bytes).unwrap();
        store.put(&ctx(), &Key::new("A", "2"), &bytes).unwrap();

        let rows = store.query(&ctx(), &QueryDescriptor::new("A")).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|(k, _)| k.kind() == "A"));
        assert_eq!(store.count(&ctx(), &QueryDescriptor::new("B")).unwrap(), 1);
    }

    #[test]
    fn store_concurrent_puts() {
        let store = InMemoryStore::new();
        thread::scope(|s| {
            for i in 0..8 {
                let store = &store;
                s.spawn(move || {
                    store
                        .put(&Context::background(), &Key::new("N", i.to_string()), b"x")
                        .unwrap();
                });
            }
        });
        assert_eq!(store.len(), 8);
    }

    #[test]
    fn cache_set_then_get() {
        let cache = InMemoryCache::new();
        cache.set(&ctx(), "k", b"v", None).unwrap();
        assert_eq!(cache.get(&ctx(), "k").unwrap(), b"v");
        assert!(cache.contains("k"));
    }

    #[test]
    fn cache_get_missing_is_miss() {
        let cache = InMemoryCache::new();
        assert!(cache.get(&ctx(), "k").unwrap_err().is_cache_miss());
    }

    #[test]
    fn cache_expired_entry_is_miss() {
        let cache = InMemoryCache::new();
        cache.set(&ctx(), "k", b"v", Some(Duration::ZERO)).unwrap();
        assert!(cache.get(&ctx(), "k").unwrap_err().is_cache_miss());
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_delete() {
        let cache = InMemoryCache::new();
        cache.set(&ctx(), "k", b"v", None).unwrap();
        cache.delete(&ctx(), "k").unwrap();
        assert!(!cache.contains("k"));
        assert!(cache.delete(&ctx(), "k").unwrap_err().is_cache_miss());
    }

    #[test]
    fn cache_clear() {
        let cache = InMemoryCache::new();
        cache.set(&ctx(), "a", b"1", None).unwrap();
        cache.set(&ctx(), "b", b"2", None).unwrap();
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
