//! Instrumented and failing backends, and random-source doubles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use storm_backend::{
    BackendError, BackendResult, CacheStore, Context, DurableStore, Key, QueryDescriptor,
};
use storm_core::RandomSource;

/// Call counters shared by the counting doubles.
#[derive(Debug, Default)]
pub struct CallCounts {
    gets: AtomicUsize,
    writes: AtomicUsize,
    deletes: AtomicUsize,
    queries: AtomicUsize,
}

impl CallCounts {
    /// Number of reads.
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of writes (`put` or `set`).
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of deletes.
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Number of queries and counts.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Resets every counter to zero.
    pub fn reset(&self) {
        self.gets.store(0, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
        self.deletes.store(0, Ordering::SeqCst);
        self.queries.store(0, Ordering::SeqCst);
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// A durable store that counts calls before delegating.
#[derive(Debug, Default)]
pub struct CountingStore<S> {
    inner: S,
    counts: CallCounts,
}

impl<S: DurableStore> CountingStore<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            counts: CallCounts::default(),
        }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns the call counters.
    pub fn counts(&self) -> &CallCounts {
        &self.counts
    }
}

impl<S: DurableStore> DurableStore for CountingStore<S> {
    fn get(&self, ctx: &Context, key: &Key) -> BackendResult<Vec<u8>> {
        CallCounts::bump(&self.counts.gets);
        self.inner.get(ctx, key)
    }

    fn put(&self, ctx: &Context, key: &Key, data: &[u8]) -> BackendResult<()> {
        CallCounts::bump(&self.counts.writes);
        self.inner.put(ctx, key, data)
    }

    fn delete(&self, ctx: &Context, key: &Key) -> BackendResult<()> {
        CallCounts::bump(&self.counts.deletes);
        self.inner.delete(ctx, key)
    }

    fn query(&self, ctx: &Context, query: &QueryDescriptor) -> BackendResult<Vec<(Key, Vec<u8>)>> {
        CallCounts::bump(&self.counts.queries);
        self.inner.query(ctx, query)
    }

    fn count(&self, ctx: &Context, query: &QueryDescriptor) -> BackendResult<usize> {
        CallCounts::bump(&self.counts.queries);
        self.inner.count(ctx, query)
    }
}

/// A cache that counts calls before delegating.
#[derive(Debug, Default)]
pub struct CountingCache<C> {
    inner: C,
    counts: CallCounts,
}

impl<C: CacheStore> CountingCache<C> {
    /// Wraps `inner`.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            counts: CallCounts::default(),
        }
    }

    /// Returns the wrapped cache.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Returns the call counters.
    pub fn counts(&self) -> &CallCounts {
        &self.counts
    }
}

impl<C: CacheStore> CacheStore for CountingCache<C> {
    fn get(&self, ctx: &Context, key: &str) -> BackendResult<Vec<u8>> {
        CallCounts::bump(&self.counts.gets);
        self.inner.get(ctx, key)
    }

    fn set(&self, ctx: &Context, key: &str, data: &[u8], ttl: Option<Duration>) -> BackendResult<()> {
        CallCounts::bump(&self.counts.writes);
        self.inner.set(ctx, key, data, ttl)
    }

    fn delete(&self, ctx: &Context, key: &str) -> BackendResult<()> {
        CallCounts::bump(&self.counts.deletes);
        self.inner.delete(ctx, key)
    }
}

/// A cache whose every call fails as unavailable.
#[derive(Debug, Clone)]
pub struct FailingCache {
    reason: String,
}

impl FailingCache {
    /// Creates a cache that fails with `reason`.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> BackendResult<T> {
        Err(BackendError::Unavailable(self.reason.clone()))
    }
}

impl Default for FailingCache {
    fn default() -> Self {
        Self::new("cache offline")
    }
}

impl CacheStore for FailingCache {
    fn get(&self, _ctx: &Context, _key: &str) -> BackendResult<Vec<u8>> {
        self.fail()
    }

    fn set(&self, _ctx: &Context, _key: &str, _data: &[u8], _ttl: Option<Duration>) -> BackendResult<()> {
        self.fail()
    }

    fn delete(&self, _ctx: &Context, _key: &str) -> BackendResult<()> {
        self.fail()
    }
}

/// A random source that always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExhaustedRandom;

impl RandomSource for ExhaustedRandom {
    fn fill(&self, _dest: &mut [u8]) -> Result<(), String> {
        Err("entropy source exhausted".to_string())
    }
}

/// A random source that repeats one byte pattern.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom([u8; 16]);

impl FixedRandom {
    /// Creates a source that always yields `bytes`.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl RandomSource for FixedRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), String> {
        for (d, s) in dest.iter_mut().zip(self.0.iter().cycle()) {
            *d = *s;
        }
        Ok(())
    }
}
