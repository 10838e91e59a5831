//! # storm core
//!
//! Entity persistence orchestration on top of a durable store and a cache.
//!
//! This crate provides:
//! - The [`Model`] trait and optional record capabilities (explicit
//!   identity, display name, self-validation, lifecycle hooks)
//! - Identity resolution and identifier generation
//! - [`DataModel`], the per-record wrapper with cache-aside reads,
//!   write-through writes and concurrent post-operation hooks
//! - [`Query`], a filtered and ordered enumeration over one collection
//!   with an injectable [`MockQueryResult`]
//!
//! Backends are opaque byte stores from `storm_backend`; this crate owns
//! the CBOR encoding of records.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde::{Deserialize, Serialize};
//! use storm_backend::{Context, InMemoryCache, InMemoryStore};
//! use storm_core::{string_field, FieldDescriptor, Model, Storm};
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct Task {
//!     #[serde(rename = "ID")]
//!     id: String,
//!     #[serde(rename = "Done")]
//!     done: bool,
//! }
//!
//! impl Model for Task {
//!     fn fields() -> Vec<FieldDescriptor<Self>> {
//!         vec![string_field!(Task, "ID", id), FieldDescriptor::other("Done")]
//!     }
//! }
//!
//! let storm = Storm::new(Arc::new(InMemoryStore::new()), Arc::new(InMemoryCache::new()));
//! let ctx = Context::background();
//!
//! let mut task = Task::default();
//! storm.model(&mut task).with_context(ctx.clone()).save().unwrap();
//!
//! let open = storm.query(&Task::default()).filter("Done", false).count(&ctx).unwrap();
//! assert_eq!(open, 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod data_model;
mod entity;
mod error;
mod fanout;
mod query;
mod resolver;
mod storm;

pub use config::{StormConfig, DEFAULT_CACHE_PREFIX};
pub use data_model::DataModel;
pub use entity::{
    CacheHook, DeleteHook, DisplayNamed, EntityId, FieldDescriptor, IdentityProvider,
    IdentitySettable, Model, OsRandom, RandomSource, SaveHook, SelfValidating, UncacheHook,
    ID_FIELD_NAME, ID_TAG,
};
pub use error::{CoreError, CoreResult, HookError, HookKind, HookResult};
pub use query::{MockQueryResult, Query};
pub use storm::Storm;
