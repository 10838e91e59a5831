//! The orchestrator handle.

use crate::config::StormConfig;
use crate::data_model::DataModel;
use crate::entity::Model;
use crate::error::CoreResult;
use crate::query::Query;
use std::fmt;
use std::sync::Arc;
use storm_backend::{CacheStore, DurableStore};

/// Binds a durable store and a cache to one configuration.
///
/// `Storm` is cheap to clone; clones share the same backends. Wrappers
/// and queries built from it hold their own clone, so nothing borrows
/// the handle.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use serde::{Deserialize, Serialize};
/// use storm_backend::{Context, InMemoryCache, InMemoryStore};
/// use storm_core::{string_field, FieldDescriptor, Model, Storm};
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct Note {
///     #[serde(rename = "ID")]
///     id: String,
///     body: String,
/// }
///
/// impl Model for Note {
///     fn fields() -> Vec<FieldDescriptor<Self>> {
///         vec![string_field!(Note, "ID", id)]
///     }
/// }
///
/// let storm = Storm::new(Arc::new(InMemoryStore::new()), Arc::new(InMemoryCache::new()));
///
/// let mut note = Note { body: "hello".into(), ..Note::default() };
/// storm.model(&mut note).with_context(Context::background()).save().unwrap();
/// assert_eq!(note.id.len(), 36);
///
/// let mut loaded = Note { id: note.id.clone(), ..Note::default() };
/// storm.model(&mut loaded).with_context(Context::background()).load().unwrap();
/// assert_eq!(loaded.body, "hello");
/// ```
#[derive(Clone)]
pub struct Storm {
    store: Arc<dyn DurableStore>,
    cache: Arc<dyn CacheStore>,
    config: StormConfig,
}

impl Storm {
    /// Creates an orchestrator with the default configuration.
    pub fn new(store: Arc<dyn DurableStore>, cache: Arc<dyn CacheStore>) -> Self {
        Self::with_config(store, cache, StormConfig::default())
    }

    /// Creates an orchestrator with the given configuration.
    pub fn with_config(
        store: Arc<dyn DurableStore>,
        cache: Arc<dyn CacheStore>,
        config: StormConfig,
    ) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    /// Wraps a record for persistence operations.
    ///
    /// # Panics
    ///
    /// Panics if the record type's field declaration is invalid. Use
    /// [`Storm::try_model`] to handle that case.
    pub fn model<'a, M: Model>(&self, record: &'a mut M) -> DataModel<'a, M> {
        match self.try_model(record) {
            Ok(wrapper) => wrapper,
            Err(err) => panic!("cannot wrap {}: {err}", M::type_name()),
        }
    }

    /// Wraps a record for persistence operations.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvalidModel`] if the record type's
    /// field declaration is invalid.
    pub fn try_model<'a, M: Model>(&self, record: &'a mut M) -> CoreResult<DataModel<'a, M>> {
        DataModel::bind(self.clone(), Some(record))
    }

    /// Creates a wrapper with no record bound.
    ///
    /// Every operation on it fails with [`crate::CoreError::NoModel`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvalidModel`] if the record type's
    /// field declaration is invalid.
    pub fn unbound<M: Model>(&self) -> CoreResult<DataModel<'static, M>> {
        DataModel::bind(self.clone(), None)
    }

    /// Starts a query over the collection `record` belongs to.
    pub fn query<M: Model>(&self, record: &M) -> Query<M> {
        Query::new(Arc::clone(&self.store), record)
    }

    /// Returns the durable store.
    pub fn store(&self) -> &Arc<dyn DurableStore> {
        &self.store
    }

    /// Returns the cache.
    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StormConfig {
        &self.config
    }
}

impl fmt::Debug for Storm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storm")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
