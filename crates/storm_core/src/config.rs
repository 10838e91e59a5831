//! Orchestrator configuration.

use crate::entity::{OsRandom, RandomSource};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default prefix of cache keys.
pub const DEFAULT_CACHE_PREFIX: &str = "model";

/// Configuration for a [`crate::Storm`] orchestrator.
#[derive(Clone)]
pub struct StormConfig {
    /// First segment of every cache key (`prefix.collection.id`).
    pub cache_prefix: String,

    /// Expiry passed to the cache on every write (`None` = no expiry).
    pub cache_ttl: Option<Duration>,

    /// Whether uncaching a record that is not cached succeeds.
    pub tolerate_uncache_miss: bool,

    /// Whether a load served by the durable store populates the cache.
    pub cache_on_load: bool,

    /// Entropy source for generated identifiers.
    pub random_source: Arc<dyn RandomSource>,
}

impl Default for StormConfig {
    fn default() -> Self {
        Self {
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            cache_ttl: None,
            tolerate_uncache_miss: true,
            cache_on_load: true,
            random_source: Arc::new(OsRandom),
        }
    }
}

impl StormConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cache key prefix.
    #[must_use]
    pub fn cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = prefix.into();
        self
    }

    /// Sets the cache entry expiry.
    #[must_use]
    pub const fn cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Sets whether uncaching a missing entry succeeds.
    #[must_use]
    pub const fn tolerate_uncache_miss(mut self, value: bool) -> Self {
        self.tolerate_uncache_miss = value;
        self
    }

    /// Sets whether loads populate the cache.
    #[must_use]
    pub const fn cache_on_load(mut self, value: bool) -> Self {
        self.cache_on_load = value;
        self
    }

    /// Sets the entropy source for generated identifiers.
    #[must_use]
    pub fn random_source(mut self, source: Arc<dyn RandomSource>) -> Self {
        self.random_source = source;
        self
    }
}

impl fmt::Debug for StormConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StormConfig")
            .field("cache_prefix", &self.cache_prefix)
            .field("cache_ttl", &self.cache_ttl)
            .field("tolerate_uncache_miss", &self.tolerate_uncache_miss)
            .field("cache_on_load", &self.cache_on_load)
            .finish_non_exhaustive()
    }
}
