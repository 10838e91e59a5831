//! The entity wrapper.
//!
//! A [`DataModel`] binds one caller-owned record to its storage key and
//! cache key and runs the persistence operations on it:
//!
//! - **load**: cache-aside read; the cache is tried first, the durable
//!   store on a miss, and the cache is repopulated from the store
//! - **save**: validate, write the durable store, then write the cache
//!   and run the after-save hook concurrently
//! - **cache** / **uncache**: write or remove the cache entry, then run
//!   the matching hook
//! - **delete**: remove the durable entry, then uncache and run the
//!   after-delete hook concurrently
//!
//! Resolution (identity field, collection name, identifier) happens once
//! per wrapper and is guarded by a mutex. The record sits behind a
//! read-write lock, so `&DataModel` can be shared across threads. The
//! mutex is always taken before the record lock.

use crate::entity::{EntityId, FieldDescriptor, Model};
use crate::error::{CoreError, CoreResult, HookKind};
use crate::fanout;
use crate::resolver::{check_declaration, collection_name, find_id_field};
use crate::storm::Storm;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use storm_backend::{Context, Key};
use storm_codec::{from_cbor, to_cbor};
use tracing::{debug, warn};

/// Facts resolved from the record, memoized per wrapper.
#[derive(Debug, Default)]
struct Resolution {
    verified: bool,
    id_field: Option<usize>,
    collection: Option<String>,
    id: Option<String>,
}

/// Wraps one record for persistence operations.
///
/// Created with [`Storm::model`]. Bind an execution context with
/// [`DataModel::with_context`] before running any operation.
pub struct DataModel<'a, M: Model> {
    storm: Storm,
    model: Option<RwLock<&'a mut M>>,
    ctx: Option<Context>,
    fields: Vec<FieldDescriptor<M>>,
    state: Mutex<Resolution>,
}

impl<'a, M: Model> DataModel<'a, M> {
    pub(crate) fn bind(storm: Storm, model: Option<&'a mut M>) -> CoreResult<Self> {
        let fields = M::fields();
        check_declaration::<M>(&fields)?;
        Ok(Self {
            storm,
            model: model.map(RwLock::new),
            ctx: None,
            fields,
            state: Mutex::new(Resolution::default()),
        })
    }

    /// Binds the execution context used by every operation.
    #[must_use]
    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = Some(ctx);
        self
    }

    /// Replaces the bound execution context.
    pub fn set_context(&mut self, ctx: Context) {
        self.ctx = Some(ctx);
    }

    /// Returns the bound execution context.
    pub fn context(&self) -> Option<&Context> {
        self.ctx.as_ref()
    }

    /// Returns true once [`DataModel::verify`] has succeeded.
    pub fn is_verified(&self) -> bool {
        self.state.lock().verified
    }

    /// Checks that the wrapper can run operations and resolves the
    /// identity field and collection name.
    ///
    /// Idempotent: after the first success the record is not consulted
    /// again.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NoContext`] if no context is bound
    /// - [`CoreError::NoModel`] if no record is bound
    /// - [`CoreError::NoIdField`] if the record has neither an identity
    ///   field nor an identity capability
    pub fn verify(&self) -> CoreResult<()> {
        let mut state = self.state.lock();
        self.verify_locked(&mut state)
    }

    /// Returns the record's identifier, resolving it on first use.
    ///
    /// A non-empty explicit identity wins, then a non-empty value in the
    /// identity field. Otherwise a new identifier is generated and handed
    /// to the record: through its identity-setting capability and, if the
    /// identity field holds a string, by writing that field. The result
    /// never changes for the lifetime of the wrapper.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoModel`] if no record is bound, or
    /// [`CoreError::RandomSource`] if generation fails. Nothing is stored
    /// on failure, so a later call tries again.
    pub fn id(&self) -> CoreResult<String> {
        let mut state = self.state.lock();
        self.id_locked(&mut state)
    }

    /// Returns the collection the record belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoModel`] if no record is bound.
    pub fn collection_name(&self) -> CoreResult<String> {
        let mut state = self.state.lock();
        self.collection_locked(&mut state)
    }

    /// Returns the storage key, verifying the wrapper first.
    ///
    /// # Errors
    ///
    /// Fails as [`DataModel::verify`] and [`DataModel::id`] do.
    pub fn key(&self) -> CoreResult<Key> {
        let mut state = self.state.lock();
        self.verify_locked(&mut state)?;
        let collection = self.collection_locked(&mut state)?;
        let id = self.id_locked(&mut state)?;
        Ok(Key::new(collection, id))
    }

    /// Returns the cache key, `<prefix>.<collection>.<id>`.
    ///
    /// # Errors
    ///
    /// Fails as [`DataModel::key`] does.
    pub fn cache_key(&self) -> CoreResult<String> {
        Ok(self.cache_key_for(&self.key()?))
    }

    /// Reads the record, preferring the cache.
    ///
    /// The decoded state is merged into the bound record through
    /// [`Model::absorb`].
    ///
    /// On a cache hit the durable store is not touched. On a miss the
    /// record is read from the durable store and, if enabled, written
    /// back to the cache; a failed write-back is only logged. Unreadable
    /// cache entries are treated as misses.
    ///
    /// # Errors
    ///
    /// Returns the durable store's error unchanged (wrapped in
    /// [`CoreError::Backend`]), including not-found when neither layer
    /// holds the entity.
    pub fn load(&self) -> CoreResult<()> {
        let key = self.key()?;
        let ctx = self.bound_context()?;
        let lock = self.bound_model()?;
        let cache_key = self.cache_key_for(&key);
        debug!(collection = key.kind(), id = key.name(), "load");

        match self.storm.cache().get(ctx, &cache_key) {
            Ok(bytes) => match from_cbor::<M>(&bytes) {
                Ok(record) => {
                    lock.write().absorb(record);
                    debug!(key = %cache_key, "served from cache");
                    return Ok(());
                }
                Err(err) => warn!(key = %cache_key, error = %err, "discarding unreadable cache entry"),
            },
            Err(err) if err.is_cache_miss() => {}
            Err(err) => warn!(key = %cache_key, error = %err, "cache read failed"),
        }

        let bytes = self.storm.store().get(ctx, &key)?;
        let record = from_cbor::<M>(&bytes)?;
        lock.write().absorb(record);

        let config = self.storm.config();
        if config.cache_on_load {
            if let Err(err) = self.storm.cache().set(ctx, &cache_key, &bytes, config.cache_ttl) {
                warn!(key = %cache_key, error = %err, "failed to repopulate cache");
            }
        }
        Ok(())
    }

    /// Writes the record to the durable store and the cache.
    ///
    /// Self-validation runs first and aborts the save before any I/O.
    /// After the durable write, the cache write and the after-save hook
    /// run concurrently. Both complete; the first error is returned. A
    /// failure at that point leaves the durable write in place.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the record rejects itself,
    /// a backend error, or [`CoreError::Hook`].
    pub fn save(&self) -> CoreResult<()> {
        self.verify()?;
        let lock = self.bound_model()?;
        {
            let model = lock.read();
            if let Some(validating) = model.as_self_validating() {
                validating.validate().map_err(CoreError::Validation)?;
            }
        }

        let key = self.key()?;
        let ctx = self.bound_context()?;
        let cache_key = self.cache_key_for(&key);
        debug!(collection = key.kind(), id = key.name(), "save");

        let model = lock.read();
        let record: &M = &model;
        let bytes = to_cbor(record)?;
        self.storm.store().put(ctx, &key, &bytes)?;

        fanout::join(
            || self.write_cache(ctx, &cache_key, &bytes),
            fanout::has_hook(record, HookKind::AfterSave)
                .then_some(|| fanout::run_hook(record, HookKind::AfterSave)),
        )
    }

    /// Writes the record to the cache, then runs the after-cache hook.
    ///
    /// # Errors
    ///
    /// Returns a backend error or [`CoreError::Hook`].
    pub fn cache(&self) -> CoreResult<()> {
        let key = self.key()?;
        let ctx = self.bound_context()?;
        let lock = self.bound_model()?;
        let cache_key = self.cache_key_for(&key);
        debug!(collection = key.kind(), id = key.name(), "cache");

        let model = lock.read();
        let record: &M = &model;
        let bytes = to_cbor(record)?;
        self.write_cache(ctx, &cache_key, &bytes)?;
        fanout::run_hook(record, HookKind::AfterCache)
    }

    /// Removes the record from the cache, then runs the after-uncache hook.
    ///
    /// Removing an entry that is not cached succeeds unless
    /// [`crate::StormConfig::tolerate_uncache_miss`] is off.
    ///
    /// # Errors
    ///
    /// Returns a backend error or [`CoreError::Hook`].
    pub fn uncache(&self) -> CoreResult<()> {
        let key = self.key()?;
        let ctx = self.bound_context()?;
        let lock = self.bound_model()?;
        debug!(collection = key.kind(), id = key.name(), "uncache");

        let model = lock.read();
        self.uncache_record(ctx, &key, &model)
    }

    /// Removes the record from the durable store.
    ///
    /// After the durable delete, the record is uncached (with its
    /// after-uncache hook) while the after-delete hook runs concurrently.
    /// Both complete; the first error is returned.
    ///
    /// # Errors
    ///
    /// Returns the store's not-found error if the entity was never saved,
    /// another backend error, or [`CoreError::Hook`].
    pub fn delete(&self) -> CoreResult<()> {
        let key = self.key()?;
        let ctx = self.bound_context()?;
        let lock = self.bound_model()?;
        debug!(collection = key.kind(), id = key.name(), "delete");

        self.storm.store().delete(ctx, &key)?;

        let model = lock.read();
        let record: &M = &model;
        fanout::join(
            || self.uncache_record(ctx, &key, record),
            fanout::has_hook(record, HookKind::AfterDelete)
                .then_some(|| fanout::run_hook(record, HookKind::AfterDelete)),
        )
    }

    fn verify_locked(&self, state: &mut Resolution) -> CoreResult<()> {
        if state.verified {
            return Ok(());
        }
        if self.ctx.is_none() {
            return Err(CoreError::NoContext);
        }
        let lock = self.bound_model()?;

        let id_field = find_id_field(&self.fields);
        match id_field {
            Some(idx) if !self.fields[idx].is_string() => {
                warn!(
                    model = M::type_name(),
                    field = self.fields[idx].name(),
                    "identity field is not a string; generated ids will not be written to it"
                );
            }
            Some(_) => {}
            None => {
                if lock.read().as_identity_provider().is_none() {
                    return Err(CoreError::no_id_field(M::type_name()));
                }
            }
        }

        self.collection_locked(state)?;
        state.id_field = id_field;
        state.verified = true;
        Ok(())
    }

    fn collection_locked(&self, state: &mut Resolution) -> CoreResult<String> {
        if let Some(collection) = &state.collection {
            return Ok(collection.clone());
        }
        let lock = self.bound_model()?;
        let collection = collection_name(&**lock.read());
        state.collection = Some(collection.clone());
        Ok(collection)
    }

    fn id_locked(&self, state: &mut Resolution) -> CoreResult<String> {
        if let Some(id) = &state.id {
            return Ok(id.clone());
        }
        let lock = self.bound_model()?;
        let id_field = state.id_field.or_else(|| find_id_field(&self.fields));

        let existing = {
            let model = lock.read();
            let record: &M = &model;
            record
                .as_identity_provider()
                .map(|provider| provider.entity_id())
                .filter(|id| !id.is_empty())
                .or_else(|| {
                    id_field
                        .and_then(|idx| self.fields[idx].get(record))
                        .filter(|id| !id.is_empty())
                        .map(str::to_string)
                })
        };
        if let Some(id) = existing {
            state.id = Some(id.clone());
            return Ok(id);
        }

        let id = EntityId::generate(self.storm.config().random_source.as_ref())?.to_string();
        {
            let mut model = lock.write();
            if let Some(settable) = model.as_identity_settable() {
                settable.set_entity_id(id.clone());
            }
            if let Some(idx) = id_field {
                self.fields[idx].set(&mut **model, id.clone());
            }
        }
        debug!(model = M::type_name(), id = %id, "generated id");
        state.id = Some(id.clone());
        Ok(id)
    }

    fn uncache_record(&self, ctx: &Context, key: &Key, record: &M) -> CoreResult<()> {
        let cache_key = self.cache_key_for(key);
        match self.storm.cache().delete(ctx, &cache_key) {
            Ok(()) => {}
            Err(err) if err.is_cache_miss() && self.storm.config().tolerate_uncache_miss => {
                debug!(key = %cache_key, "entry was not cached");
            }
            Err(err) => return Err(err.into()),
        }
        fanout::run_hook(record, HookKind::AfterUncache)
    }

    fn write_cache(&self, ctx: &Context, cache_key: &str, bytes: &[u8]) -> CoreResult<()> {
        let ttl = self.storm.config().cache_ttl;
        self.storm.cache().set(ctx, cache_key, bytes, ttl)?;
        Ok(())
    }

    fn cache_key_for(&self, key: &Key) -> String {
        format!(
            "{}.{}.{}",
            self.storm.config().cache_prefix,
            key.kind(),
            key.name()
        )
    }

    fn bound_context(&self) -> CoreResult<&Context> {
        self.ctx.as_ref().ok_or(CoreError::NoContext)
    }

    fn bound_model(&self) -> CoreResult<&RwLock<&'a mut M>> {
        self.model.as_ref().ok_or(CoreError::NoModel)
    }
}

impl<M: Model> fmt::Debug for DataModel<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataModel")
            .field("model", &M::type_name())
            .field("bound", &self.model.is_some())
            .field("ctx", &self.ctx)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StormConfig;
    use crate::entity::{
        CacheHook, DeleteHook, DisplayNamed, IdentityProvider, IdentitySettable, RandomSource,
        SaveHook, SelfValidating, UncacheHook,
    };
    use crate::error::HookResult;
    use crate::string_field;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use storm_backend::{BackendError, CacheStore, DurableStore, InMemoryCache, InMemoryStore};

    struct Env {
        storm: Storm,
        store: Arc<InMemoryStore>,
        cache: Arc<InMemoryCache>,
    }

    fn env() -> Env {
        env_with(StormConfig::default())
    }

    fn env_with(config: StormConfig) -> Env {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let storm = Storm::with_config(store.clone(), cache.clone(), config);
        Env {
            storm,
            store,
            cache,
        }
    }

    fn ctx() -> Context {
        Context::background()
    }

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(rename = "ID")]
        id: String,
        #[serde(rename = "Value")]
        value: String,
    }

    impl Model for Note {
        fn fields() -> Vec<FieldDescriptor<Self>> {
            vec![string_field!(Note, "ID", id), string_field!(Note, "Value", value)]
        }
    }

    fn note(value: &str) -> Note {
        Note {
            value: value.to_string(),
            ..Note::default()
        }
    }

    /// Identity through a tagged field only.
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Account {
        email: String,
    }

    impl Model for Account {
        fn fields() -> Vec<FieldDescriptor<Self>> {
            vec![string_field!(Account, "Email", email).tagged("id")]
        }
    }

    /// Both a tagged field and a field named `ID`; the tag comes first.
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Both {
        key: String,
        id: String,
    }

    impl Model for Both {
        fn fields() -> Vec<FieldDescriptor<Self>> {
            vec![
                string_field!(Both, "Key", key).tagged("id"),
                string_field!(Both, "ID", id),
            ]
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct NoIdentity {
        value: String,
    }

    impl Model for NoIdentity {}

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Explicit {
        handle: String,
        #[serde(skip)]
        assigned: Vec<String>,
    }

    impl IdentityProvider for Explicit {
        fn entity_id(&self) -> String {
            self.handle.clone()
        }
    }

    impl IdentitySettable for Explicit {
        fn set_entity_id(&mut self, id: String) {
            self.assigned.push(id);
        }
    }

    impl Model for Explicit {
        fn as_identity_provider(&self) -> Option<&dyn IdentityProvider> {
            Some(self)
        }

        fn as_identity_settable(&mut self) -> Option<&mut dyn IdentitySettable> {
            Some(self)
        }
    }

    #[derive(Default, Serialize, Deserialize)]
    struct Counted {
        #[serde(rename = "ID")]
        id: String,
        #[serde(skip)]
        name_calls: AtomicUsize,
    }

    impl DisplayNamed for Counted {
        fn entity_name(&self) -> String {
            self.name_calls.fetch_add(1, Ordering::SeqCst);
            "counted".to_string()
        }
    }

    impl Model for Counted {
        fn fields() -> Vec<FieldDescriptor<Self>> {
            vec![string_field!(Counted, "ID", id)]
        }

        fn as_display_named(&self) -> Option<&dyn DisplayNamed> {
            Some(self)
        }
    }

    /// Records every hook invocation; fails the ones listed in `fail`.
    #[derive(Default, Serialize, Deserialize)]
    struct Hooked {
        #[serde(rename = "ID")]
        id: String,
        #[serde(skip)]
        fail: Vec<&'static str>,
        #[serde(skip)]
        calls: Mutex<Vec<&'static str>>,
    }

    impl Hooked {
        fn fire(&self, name: &'static str) -> HookResult {
            self.calls.lock().push(name);
            if self.fail.contains(&name) {
                return Err(format!("{name} refused").into());
            }
            Ok(())
        }

        fn calls(&self) -> Vec<&'static str> {
            let mut calls = self.calls.lock().clone();
            calls.sort_unstable();
            calls
        }
    }

    impl SelfValidating for Hooked {
        fn validate(&self) -> HookResult {
            self.fire("validate")
        }
    }

    impl SaveHook for Hooked {
        fn after_save(&self) -> HookResult {
            self.fire("save")
        }
    }

    impl CacheHook for Hooked {
        fn after_cache(&self) -> HookResult {
            self.fire("cache")
        }
    }

    impl UncacheHook for Hooked {
        fn after_uncache(&self) -> HookResult {
            self.fire("uncache")
        }
    }

    impl DeleteHook for Hooked {
        fn after_delete(&self) -> HookResult {
            self.fire("delete")
        }
    }

    impl Model for Hooked {
        fn fields() -> Vec<FieldDescriptor<Self>> {
            vec![string_field!(Hooked, "ID", id)]
        }

        fn as_self_validating(&self) -> Option<&dyn SelfValidating> {
            Some(self)
        }

        fn as_save_hook(&self) -> Option<&dyn SaveHook> {
            Some(self)
        }

        fn as_cache_hook(&self) -> Option<&dyn CacheHook> {
            Some(self)
        }

        fn as_uncache_hook(&self) -> Option<&dyn UncacheHook> {
            Some(self)
        }

        fn as_delete_hook(&self) -> Option<&dyn DeleteHook> {
            Some(self)
        }
    }

    fn hooked(fail: &[&'static str]) -> Hooked {
        Hooked {
            fail: fail.to_vec(),
            ..Hooked::default()
        }
    }

    struct Exhausted;

    impl RandomSource for Exhausted {
        fn fill(&self, _dest: &mut [u8]) -> Result<(), String> {
            Err("entropy exhausted".to_string())
        }
    }

    #[test]
    fn verify_requires_context() {
        let env = env();
        let mut record = note("x");
        let wrapper = env.storm.model(&mut record);
        assert!(matches!(wrapper.verify(), Err(CoreError::NoContext)));
        assert!(matches!(wrapper.save(), Err(CoreError::NoContext)));
        assert!(!wrapper.is_verified());
    }

    #[test]
    fn verify_requires_model() {
        let env = env();
        let wrapper = env.storm.unbound::<Note>().unwrap().with_context(ctx());
        assert!(matches!(wrapper.verify(), Err(CoreError::NoModel)));
        assert!(matches!(wrapper.id(), Err(CoreError::NoModel)));
        assert!(matches!(wrapper.load(), Err(CoreError::NoModel)));
    }

    #[test]
    fn verify_requires_identity() {
        let env = env();
        let mut record = NoIdentity::default();
        let wrapper = env.storm.model(&mut record).with_context(ctx());
        let err = wrapper.verify().unwrap_err();
        assert_eq!(err.to_string(), "Type NoIdentity has no ID field");
    }

    #[test]
    fn explicit_identity_needs_no_field() {
        let env = env();
        let mut record = Explicit {
            handle: "acct-7".to_string(),
            ..Explicit::default()
        };
        let wrapper = env.storm.model(&mut record).with_context(ctx());
        wrapper.verify().unwrap();
        assert_eq!(wrapper.id().unwrap(), "acct-7");
        drop(wrapper);
        assert!(record.assigned.is_empty());
    }

    #[test]
    fn verify_is_idempotent() {
        let env = env();
        let mut record = Counted::default();
        let wrapper = env.storm.model(&mut record).with_context(ctx());
        wrapper.verify().unwrap();
        wrapper.verify().unwrap();
        assert_eq!(wrapper.collection_name().unwrap(), "counted");
        assert_eq!(wrapper.key().unwrap().kind(), "counted");
        drop(wrapper);
        assert_eq!(record.name_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_verify_resolves_once() {
        let env = env();
        let mut record = Counted::default();
        let wrapper = env.storm.model(&mut record).with_context(ctx());
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| wrapper.verify().unwrap());
            }
        });
        assert!(wrapper.is_verified());
        drop(wrapper);
        assert_eq!(record.name_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn generated_id_is_stable_and_written_back() {
        let env = env();
        let mut record = note("x");
        let wrapper = env.storm.model(&mut record).with_context(ctx());
        let first = wrapper.id().unwrap();
        assert_eq!(first.len(), 36);
        assert_eq!(wrapper.id().unwrap(), first);
        drop(wrapper);
        assert_eq!(record.id, first);
    }

    #[test]
    fn existing_field_value_is_kept() {
        let env = env();
        let mut record = Note {
            id: "n-1".to_string(),
            value: "x".to_string(),
        };
        let wrapper = env.storm.model(&mut record).with_context(ctx());
        assert_eq!(wrapper.id().unwrap(), "n-1");
        assert_eq!(wrapper.cache_key().unwrap(), "model.Note.n-1");
    }

    #[test]
    fn tagged_field_receives_id() {
        let env = env();
        let mut record = Account::default();
        let id = env.storm.model(&mut record).with_context(ctx()).id().unwrap();
        assert_eq!(record.email, id);
    }

    #[test]
    fn first_identity_field_wins() {
        let env = env();
        let mut record = Both::default();
        let id = env.storm.model(&mut record).with_context(ctx()).id().unwrap();
        assert_eq!(record.key, id);
        assert!(record.id.is_empty());
    }

    #[test]
    fn empty_explicit_identity_generates_and_assigns() {
        let env = env();
        let mut record = Explicit::default();
        let wrapper = env.storm.model(&mut record).with_context(ctx());
        let id = wrapper.id().unwrap();
        drop(wrapper);
        assert_eq!(record.assigned, vec![id]);
    }

    #[test]
    fn generator_failure_is_reported_and_retried() {
        let env = env_with(StormConfig::new().random_source(Arc::new(Exhausted)));
        let mut record = note("x");
        let wrapper = env.storm.model(&mut record).with_context(ctx());
        assert!(matches!(wrapper.id(), Err(CoreError::RandomSource { .. })));
        assert!(matches!(wrapper.save(), Err(CoreError::RandomSource { .. })));
        assert!(env.store.is_empty());
        drop(wrapper);
        assert!(record.id.is_empty());
    }

    #[test]
    fn save_writes_store_and_cache() {
        let env = env();
        let mut record = note("bar");
        let wrapper = env.storm.model(&mut record).with_context(ctx());
        wrapper.save().unwrap();
        let key = wrapper.key().unwrap();
        let cache_key = wrapper.cache_key().unwrap();
        drop(wrapper);

        let stored: Note = from_cbor(&env.store.get(&ctx(), &key).unwrap()).unwrap();
        assert_eq!(stored, record);
        let cached: Note = from_cbor(&env.cache.get(&ctx(), &cache_key).unwrap()).unwrap();
        assert_eq!(cached, record);
    }

    #[test]
    fn load_round_trips_through_store() {
        let env = env();
        let mut saved = note("bar");
        env.storm.model(&mut saved).with_context(ctx()).save().unwrap();
        env.cache.clear();

        let mut loaded = Note {
            id: saved.id.clone(),
            ..Note::default()
        };
        env.storm.model(&mut loaded).with_context(ctx()).load().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(env.cache.len(), 1);
    }

    #[test]
    fn load_prefers_cache() {
        let env = env();
        let mut saved = note("cached");
        env.storm.model(&mut saved).with_context(ctx()).save().unwrap();
        env.store.clear();

        let mut loaded = Note {
            id: saved.id.clone(),
            ..Note::default()
        };
        env.storm.model(&mut loaded).with_context(ctx()).load().unwrap();
        assert_eq!(loaded.value, "cached");
    }

    #[test]
    fn load_without_cache_repopulation() {
        let env = env_with(StormConfig::new().cache_on_load(false));
        let mut saved = note("bar");
        env.storm.model(&mut saved).with_context(ctx()).save().unwrap();
        env.cache.clear();

        let mut loaded = Note {
            id: saved.id.clone(),
            ..Note::default()
        };
        env.storm.model(&mut loaded).with_context(ctx()).load().unwrap();
        assert!(env.cache.is_empty());
    }

    #[test]
    fn unreadable_cache_entry_falls_back_to_store() {
        let env = env();
        let mut saved = note("bar");
        let wrapper = env.storm.model(&mut saved).with_context(ctx());
        wrapper.save().unwrap();
        let cache_key = wrapper.cache_key().unwrap();
        drop(wrapper);
        env.cache.set(&ctx(), &cache_key, b"\xff\xff", None).unwrap();

        let mut loaded = Note {
            id: saved.id.clone(),
            ..Note::default()
        };
        env.storm.model(&mut loaded).with_context(ctx()).load().unwrap();
        assert_eq!(loaded.value, "bar");
    }

    #[test]
    fn load_missing_is_not_found() {
        let env = env();
        let mut record = Note {
            id: "missing".to_string(),
            ..Note::default()
        };
        let err = env.storm.model(&mut record).with_context(ctx()).load().unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn cancelled_context_fails_operations() {
        let env = env();
        let (cancelled, handle) = ctx().with_cancel();
        handle.cancel();
        let mut record = note("x");
        let err = env.storm.model(&mut record).with_context(cancelled).save().unwrap_err();
        assert!(matches!(err, CoreError::Backend(BackendError::Cancelled)));
    }

    #[test]
    fn validation_runs_before_io() {
        let env = env();
        let mut record = hooked(&["validate"]);
        let err = env.storm.model(&mut record).with_context(ctx()).save().unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(env.store.is_empty());
        assert!(env.cache.is_empty());
        assert_eq!(record.calls(), vec!["validate"]);
    }

    #[test]
    fn save_runs_hook_and_cache() {
        let env = env();
        let mut record = hooked(&[]);
        env.storm.model(&mut record).with_context(ctx()).save().unwrap();
        assert_eq!(record.calls(), vec!["save", "validate"]);
        assert_eq!(env.store.len(), 1);
        assert_eq!(env.cache.len(), 1);
    }

    #[test]
    fn failing_save_hook_still_caches() {
        let env = env();
        let mut record = hooked(&["save"]);
        let err = env.storm.model(&mut record).with_context(ctx()).save().unwrap_err();
        assert!(matches!(
            err,
            CoreError::Hook {
                hook: HookKind::AfterSave,
                ..
            }
        ));
        assert_eq!(env.store.len(), 1);
        assert_eq!(env.cache.len(), 1);
    }

    #[test]
    fn cache_and_uncache_run_hooks() {
        let env = env();
        let mut record = hooked(&[]);
        let wrapper = env.storm.model(&mut record).with_context(ctx());
        wrapper.cache().unwrap();
        assert_eq!(env.cache.len(), 1);
        assert!(env.store.is_empty());
        wrapper.uncache().unwrap();
        assert!(env.cache.is_empty());
        drop(wrapper);
        assert_eq!(record.calls(), vec!["cache", "uncache"]);
    }

    #[test]
    fn failing_cache_hook_propagates() {
        let env = env();
        let mut record = hooked(&["cache"]);
        let err = env.storm.model(&mut record).with_context(ctx()).cache().unwrap_err();
        assert!(matches!(
            err,
            CoreError::Hook {
                hook: HookKind::AfterCache,
                ..
            }
        ));
        assert_eq!(env.cache.len(), 1);
    }

    #[test]
    fn uncache_miss_policy() {
        let env = env();
        let mut record = note("x");
        env.storm.model(&mut record).with_context(ctx()).uncache().unwrap();

        let strict = env_with(StormConfig::new().tolerate_uncache_miss(false));
        let err = strict.storm.model(&mut record).with_context(ctx()).uncache().unwrap_err();
        assert!(err.is_cache_miss());
    }

    #[test]
    fn delete_removes_both_layers() {
        let env = env();
        let mut record = hooked(&[]);
        let wrapper = env.storm.model(&mut record).with_context(ctx());
        wrapper.save().unwrap();
        wrapper.delete().unwrap();
        assert!(env.store.is_empty());
        assert!(env.cache.is_empty());
        drop(wrapper);
        assert_eq!(
            record.calls(),
            vec!["delete", "save", "uncache", "validate"]
        );
    }

    #[test]
    fn delete_never_saved_is_not_found() {
        let env = env();
        let mut record = hooked(&[]);
        let err = env.storm.model(&mut record).with_context(ctx()).delete().unwrap_err();
        assert!(err.is_not_found());
        assert!(record.calls().is_empty());
    }

    #[test]
    fn failing_delete_hook_still_uncaches() {
        let env = env();
        let mut record = hooked(&["delete"]);
        let wrapper = env.storm.model(&mut record).with_context(ctx());
        wrapper.save().unwrap();
        let err = wrapper.delete().unwrap_err();
        assert!(matches!(
            err,
            CoreError::Hook {
                hook: HookKind::AfterDelete,
                ..
            }
        ));
        assert!(env.cache.is_empty());
        drop(wrapper);
        assert!(record.calls().contains(&"uncache"));
    }

    #[test]
    fn custom_cache_prefix() {
        let env = env_with(StormConfig::new().cache_prefix("app"));
        let mut record = Note {
            id: "n-1".to_string(),
            ..Note::default()
        };
        let wrapper = env.storm.model(&mut record).with_context(ctx());
        assert_eq!(wrapper.cache_key().unwrap(), "app.Note.n-1");
    }

    #[test]
    #[should_panic(expected = "cannot wrap")]
    fn invalid_declaration_panics() {
        #[derive(Default, Serialize, Deserialize)]
        struct Twice {
            id: String,
        }

        impl Model for Twice {
            fn fields() -> Vec<FieldDescriptor<Self>> {
                vec![string_field!(Twice, "ID", id), string_field!(Twice, "ID", id)]
            }
        }

        let env = env();
        let mut record = Twice::default();
        let _ = env.storm.model(&mut record);
    }
}
