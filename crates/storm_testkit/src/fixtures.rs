//! Test fixtures.
//!
//! Provides orchestrators wired to instrumented backends.

use crate::doubles::{CountingCache, CountingStore};
use std::ops::Deref;
use std::sync::Arc;
use storm_backend::{Context, DurableStore, FileStore, InMemoryCache, InMemoryStore};
use storm_core::{Storm, StormConfig};
use tempfile::TempDir;

/// An orchestrator over counting backends, with automatic cleanup.
pub struct TestStorm<S = InMemoryStore> {
    /// The orchestrator.
    pub storm: Storm,
    /// The durable store, shared with `storm`.
    pub store: Arc<CountingStore<S>>,
    /// The cache, shared with `storm`.
    pub cache: Arc<CountingCache<InMemoryCache>>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStorm<InMemoryStore> {
    /// Creates an in-memory orchestrator with the default configuration.
    pub fn memory() -> Self {
        Self::memory_with(StormConfig::default())
    }

    /// Creates an in-memory orchestrator with `config`.
    pub fn memory_with(config: StormConfig) -> Self {
        Self::assemble(InMemoryStore::new(), config, None)
    }
}

impl TestStorm<FileStore> {
    /// Creates an orchestrator over a file store in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::open(temp_dir.path()).expect("Failed to open file store");
        Self::assemble(store, StormConfig::default(), Some(temp_dir))
    }
}

impl<S: DurableStore + 'static> TestStorm<S> {
    fn assemble(store: S, config: StormConfig, temp_dir: Option<TempDir>) -> Self {
        let store = Arc::new(CountingStore::new(store));
        let cache = Arc::new(CountingCache::new(InMemoryCache::new()));
        let storm = Storm::with_config(store.clone(), cache.clone(), config);
        Self {
            storm,
            store,
            cache,
            _temp_dir: temp_dir,
        }
    }

    /// Returns a fresh background context.
    pub fn ctx(&self) -> Context {
        Context::background()
    }

    /// Empties the cache without touching the durable store.
    pub fn clear_cache(&self) {
        self.cache.inner().clear();
    }

    /// Resets the call counters of both backends.
    pub fn reset_counts(&self) {
        self.store.counts().reset();
        self.cache.counts().reset();
    }
}

impl<S> Deref for TestStorm<S> {
    type Target = Storm;

    fn deref(&self) -> &Self::Target {
        &self.storm
    }
}

/// Runs a test with a temporary in-memory orchestrator.
pub fn with_test_storm<F, R>(f: F) -> R
where
    F: FnOnce(&TestStorm) -> R,
{
    let storm = TestStorm::memory();
    f(&storm)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use crate::records::Person;

    /// Saves the given people and returns them with their identifiers.
    pub fn populated_people(storm: &TestStorm, people: &[(&str, i64)]) -> Vec<Person> {
        let ctx = storm.ctx();
        people
            .iter()
            .map(|(name, age)| {
                let mut person = Person::new(*name, *age);
                storm
                    .model(&mut person)
                    .with_context(ctx.clone())
                    .save()
                    .expect("Failed to save person");
                person
            })
            .collect()
    }
}
