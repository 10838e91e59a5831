//! The `Model` trait and optional record capabilities.

use crate::entity::fields::FieldDescriptor;
use crate::error::HookResult;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Provides the record's identifier directly.
///
/// A non-empty value is used verbatim and takes precedence over any
/// identity field.
pub trait IdentityProvider {
    /// Returns the identifier, or an empty string if there is none yet.
    fn entity_id(&self) -> String;
}

/// Lets the record store an identifier generated for it.
pub trait IdentitySettable {
    /// Called once with each identifier generated for this record.
    fn set_entity_id(&mut self, id: String);
}

/// Names the collection the record is stored in.
///
/// An empty name falls back to the record's type name.
pub trait DisplayNamed {
    /// Returns the collection name.
    fn entity_name(&self) -> String;
}

/// Checks the record before every save.
pub trait SelfValidating {
    /// Returns an error to abort the save.
    fn validate(&self) -> HookResult;
}

/// Runs after the record was written to the durable store.
///
/// Runs concurrently with the cache write, so the record is not
/// necessarily cached yet when this is called.
pub trait SaveHook {
    /// Called after a successful save.
    fn after_save(&self) -> HookResult;
}

/// Runs after the record was written to the cache.
pub trait CacheHook {
    /// Called after a successful cache write.
    fn after_cache(&self) -> HookResult;
}

/// Runs after the record was removed from the cache.
pub trait UncacheHook {
    /// Called after a successful cache removal.
    fn after_uncache(&self) -> HookResult;
}

/// Runs after the record was removed from the durable store.
///
/// Runs concurrently with the cache removal.
pub trait DeleteHook {
    /// Called after a successful delete.
    fn after_delete(&self) -> HookResult;
}

/// A record that storm can persist.
///
/// Only the serde bounds are required. Everything else is optional:
/// the identity field is found in [`Model::fields`], and each capability
/// is opted into by overriding its accessor to return `Some(self)`.
///
/// # Example
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use storm_core::{string_field, DisplayNamed, FieldDescriptor, Model};
///
/// #[derive(Serialize, Deserialize)]
/// struct Note {
///     #[serde(rename = "ID")]
///     id: String,
///     body: String,
/// }
///
/// impl DisplayNamed for Note {
///     fn entity_name(&self) -> String {
///         "notes".to_string()
///     }
/// }
///
/// impl Model for Note {
///     fn fields() -> Vec<FieldDescriptor<Self>> {
///         vec![string_field!(Note, "ID", id), string_field!(Note, "Body", body)]
///     }
///
///     fn as_display_named(&self) -> Option<&dyn DisplayNamed> {
///         Some(self)
///     }
/// }
/// ```
pub trait Model: Serialize + DeserializeOwned + Send + Sync {
    /// The declared type name, used as the collection name by default.
    fn type_name() -> &'static str {
        short_type_name::<Self>()
    }

    /// The record's fields in declaration order.
    fn fields() -> Vec<FieldDescriptor<Self>> {
        Vec::new()
    }

    /// Takes on the persisted state of `loaded`.
    ///
    /// `load` decodes a fresh record and hands it here while holding the
    /// record lock. The default replaces the whole record; override it to
    /// keep runtime state that is not serialized, such as hook handles.
    fn absorb(&mut self, loaded: Self) {
        *self = loaded;
    }

    /// Explicit identity capability.
    fn as_identity_provider(&self) -> Option<&dyn IdentityProvider> {
        None
    }

    /// Self-set-identity capability.
    fn as_identity_settable(&mut self) -> Option<&mut dyn IdentitySettable> {
        None
    }

    /// Display-name capability.
    fn as_display_named(&self) -> Option<&dyn DisplayNamed> {
        None
    }

    /// Self-validation capability.
    fn as_self_validating(&self) -> Option<&dyn SelfValidating> {
        None
    }

    /// After-save hook.
    fn as_save_hook(&self) -> Option<&dyn SaveHook> {
        None
    }

    /// After-cache hook.
    fn as_cache_hook(&self) -> Option<&dyn CacheHook> {
        None
    }

    /// After-uncache hook.
    fn as_uncache_hook(&self) -> Option<&dyn UncacheHook> {
        None
    }

    /// After-delete hook.
    fn as_delete_hook(&self) -> Option<&dyn DeleteHook> {
        None
    }
}

/// Last path segment of a type's name, without generic arguments.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
