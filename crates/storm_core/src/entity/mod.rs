//! Record-side types: the `Model` trait, its optional capabilities,
//! declared fields and identifiers.

mod fields;
mod id;
mod model;

pub use fields::{FieldDescriptor, ID_FIELD_NAME, ID_TAG};
pub use id::{EntityId, OsRandom, RandomSource};
pub use model::{
    CacheHook, DeleteHook, DisplayNamed, IdentityProvider, IdentitySettable, Model, SaveHook,
    SelfValidating, UncacheHook,
};
