//! End-to-end behavior of the orchestrator over in-memory backends.

use std::sync::Arc;
use storm_backend::{CacheStore, DurableStore, InMemoryCache, InMemoryStore, Key};
use storm_codec::from_cbor;
use storm_core::{CoreError, HookKind, Storm, StormConfig};
use storm_testkit::prelude::*;

#[test]
fn save_then_load_value_bar() {
    let storm = TestStorm::memory();
    let ctx = storm.ctx();

    let mut saved = Note::new("bar");
    storm.model(&mut saved).with_context(ctx.clone()).save().unwrap();
    assert_eq!(saved.id.len(), 36);
    assert!(storm.store.inner().contains(&Key::new("Note", saved.id.clone())));
    assert!(storm.cache.inner().contains(&format!("model.Note.{}", saved.id)));

    storm.clear_cache();
    let mut loaded = Note::with_id(saved.id.clone());
    storm.model(&mut loaded).with_context(ctx).load().unwrap();
    assert_eq!(loaded.value, "bar");
    assert_eq!(loaded, saved);
}

#[test]
fn cache_hit_skips_durable_store() {
    let storm = TestStorm::memory();
    let ctx = storm.ctx();

    let mut saved = Note::new("bar");
    storm.model(&mut saved).with_context(ctx.clone()).save().unwrap();
    storm.reset_counts();

    let mut loaded = Note::with_id(saved.id.clone());
    storm.model(&mut loaded).with_context(ctx).load().unwrap();
    assert_eq!(storm.cache.counts().gets(), 1);
    assert_eq!(storm.store.counts().gets(), 0);
}

#[test]
fn cache_miss_reads_store_and_repopulates() {
    let storm = TestStorm::memory();
    let ctx = storm.ctx();

    let mut saved = Note::new("bar");
    storm.model(&mut saved).with_context(ctx.clone()).save().unwrap();
    storm.clear_cache();
    storm.reset_counts();

    let mut loaded = Note::with_id(saved.id.clone());
    storm.model(&mut loaded).with_context(ctx.clone()).load().unwrap();
    assert_eq!(storm.store.counts().gets(), 1);
    assert_eq!(storm.cache.counts().writes(), 1);

    let mut again = Note::with_id(saved.id.clone());
    storm.model(&mut again).with_context(ctx).load().unwrap();
    assert_eq!(storm.store.counts().gets(), 1);
}

#[test]
fn broken_cache_degrades_reads_but_fails_saves() {
    let store = Arc::new(InMemoryStore::new());
    let storm = Storm::new(store.clone(), Arc::new(FailingCache::default()));
    let ctx = storm_backend::Context::background();

    let mut note = Note::new("bar");
    let err = storm.model(&mut note).with_context(ctx.clone()).save().unwrap_err();
    assert!(matches!(err, CoreError::Backend(_)));
    // The durable write is kept.
    assert_eq!(store.len(), 1);

    let mut loaded = Note::with_id(note.id.clone());
    storm.model(&mut loaded).with_context(ctx).load().unwrap();
    assert_eq!(loaded.value, "bar");
}

#[test]
fn hooks_fan_out_after_save_and_delete() {
    let storm = TestStorm::memory();
    let ctx = storm.ctx();
    let log = EventLog::default();

    let mut record = Audited::new("hello", log.clone());
    let wrapper = storm.model(&mut record).with_context(ctx);
    wrapper.save().unwrap();
    wrapper.delete().unwrap();
    drop(wrapper);

    assert_eq!(
        record.events(),
        vec!["after-delete", "after-save", "after-uncache", "validate"]
    );
    assert!(storm.store.inner().is_empty());
    assert!(storm.cache.inner().is_empty());
}

#[test]
fn failing_hook_does_not_cancel_cache_write() {
    let storm = TestStorm::memory();
    let mut record = Audited::new("hello", EventLog::default()).failing("after-save");
    let err = storm
        .model(&mut record)
        .with_context(storm.ctx())
        .save()
        .unwrap_err();

    assert!(matches!(
        err,
        CoreError::Hook {
            hook: HookKind::AfterSave,
            ..
        }
    ));
    assert_eq!(storm.cache.counts().writes(), 1);
    assert_eq!(storm.cache.inner().len(), 1);
}

#[test]
fn failing_cache_write_does_not_cancel_save_hook() {
    let store = Arc::new(InMemoryStore::new());
    let storm = Storm::new(store.clone(), Arc::new(FailingCache::default()));
    let mut record = Audited::new("hello", EventLog::default());

    let err = storm
        .model(&mut record)
        .with_context(storm_backend::Context::background())
        .save()
        .unwrap_err();

    assert!(matches!(err, CoreError::Backend(_)));
    assert_eq!(record.events(), vec!["after-save", "validate"]);
    assert_eq!(store.len(), 1);
}

#[test]
fn failing_uncache_does_not_cancel_delete_hook() {
    let store = Arc::new(InMemoryStore::new());
    let storm = Storm::new(store.clone(), Arc::new(FailingCache::default()));
    let ctx = storm_backend::Context::background();
    let mut record = Audited::new("hello", EventLog::default());
    record.id = "audited-1".to_string();
    store
        .put(&ctx, &Key::new("Audited", "audited-1"), &storm_codec::to_cbor(&record).unwrap())
        .unwrap();

    let err = storm.model(&mut record).with_context(ctx).delete().unwrap_err();

    assert!(matches!(err, CoreError::Backend(_)));
    assert_eq!(record.events(), vec!["after-delete"]);
    assert!(store.is_empty());
}

#[test]
fn load_keeps_runtime_state_of_bound_record() {
    let storm = TestStorm::memory();
    let ctx = storm.ctx();

    let mut saved = Audited::new("hello", EventLog::default());
    storm.model(&mut saved).with_context(ctx.clone()).save().unwrap();

    let log = EventLog::default();
    let mut loaded = Audited::new("", log.clone());
    loaded.id = saved.id.clone();
    let wrapper = storm.model(&mut loaded).with_context(ctx);
    wrapper.load().unwrap();
    wrapper.delete().unwrap();
    drop(wrapper);

    assert_eq!(loaded.body, "hello");
    let mut events = log.lock().clone();
    events.sort();
    assert_eq!(events, vec!["after-delete", "after-uncache"]);
    assert_eq!(saved.events(), vec!["after-save", "validate"]);
}

#[test]
fn validation_failure_skips_all_io() {
    let storm = TestStorm::memory();
    let mut record = Audited::new("", EventLog::default());
    let err = storm
        .model(&mut record)
        .with_context(storm.ctx())
        .save()
        .unwrap_err();

    assert!(matches!(err, CoreError::Validation(_)));
    assert_eq!(err.to_string(), "validation failed: body must not be empty");
    assert_eq!(storm.store.counts().writes(), 0);
    assert_eq!(storm.cache.counts().writes(), 0);
}

#[test]
fn delete_unknown_entity_is_not_found() {
    let storm = TestStorm::memory();
    let mut note = Note::with_id("never-saved");
    let err = storm
        .model(&mut note)
        .with_context(storm.ctx())
        .delete()
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn exhausted_entropy_fails_every_time() {
    let storm = TestStorm::memory_with(StormConfig::new().random_source(Arc::new(ExhaustedRandom)));
    let mut note = Note::new("bar");
    let wrapper = storm.model(&mut note).with_context(storm.ctx());
    for _ in 0..3 {
        assert!(matches!(wrapper.id(), Err(CoreError::RandomSource { .. })));
    }
    drop(wrapper);
    assert!(note.id.is_empty());
    assert_eq!(storm.store.counts().writes(), 0);
}

#[test]
fn fixed_entropy_is_deterministic() {
    let config = StormConfig::new().random_source(Arc::new(FixedRandom::new([0; 16])));
    let storm = TestStorm::memory_with(config);
    let mut note = Note::new("bar");
    let id = storm.model(&mut note).with_context(storm.ctx()).id().unwrap();
    assert_eq!(id, "00000000-0000-4000-8000-000000000000");
}

#[test]
fn stored_bytes_are_plain_cbor() {
    let store = Arc::new(InMemoryStore::new());
    let cache = Arc::new(InMemoryCache::new());
    let storm = Storm::new(store.clone(), cache.clone());
    let ctx = storm_backend::Context::background();

    let mut person = Person::new("ada", 36);
    storm.model(&mut person).with_context(ctx.clone()).save().unwrap();

    let key = Key::new("people", person.id.clone());
    let decoded: Person = from_cbor(&store.get(&ctx, &key).unwrap()).unwrap();
    assert_eq!(decoded, person);

    let cache_key = format!("model.people.{}", person.id);
    assert!(cache.get(&ctx, &cache_key).is_ok());
}
