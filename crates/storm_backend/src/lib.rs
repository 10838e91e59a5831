//! # storm backend
//!
//! Backend contracts and reference implementations for storm.
//!
//! Backends are **opaque byte stores**: they keep encoded records under a
//! key and hand the same bytes back. They know nothing about record types,
//! identity resolution or lifecycle hooks; the core owns all of that.
//!
//! ## Contracts
//!
//! - [`DurableStore`] - the authoritative store, addressed by [`Key`]
//! - [`CacheStore`] - the fast layer, addressed by a flat string key
//!
//! Every call receives a [`Context`]. Backends check it before doing work
//! so that a cancelled or expired context fails the call with an ordinary
//! [`BackendError`].
//!
//! ## Available Backends
//!
//! - [`InMemoryStore`] / [`InMemoryCache`] - for testing and ephemeral use
//! - [`FileStore`] - one file per entity on the local file system
//!
//! ## Example
//!
//! ```rust
//! use storm_backend::{Context, DurableStore, InMemoryStore, Key};
//!
//! let store = InMemoryStore::new();
//! let ctx = Context::background();
//! let key = Key::new("Note", "n-1");
//!
//! store.put(&ctx, &key, b"payload").unwrap();
//! assert_eq!(store.get(&ctx, &key).unwrap(), b"payload");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod context;
mod error;
mod file;
mod key;
mod memory;
mod query;
mod store;

pub use cache::CacheStore;
pub use context::Context;
pub use tokio_util::sync::CancellationToken;
pub use error::{BackendError, BackendResult};
pub use file::FileStore;
pub use key::Key;
pub use memory::{InMemoryCache, InMemoryStore};
pub use query::{Direction, Filter, Operator, Order, QueryDescriptor};
pub use store::DurableStore;
