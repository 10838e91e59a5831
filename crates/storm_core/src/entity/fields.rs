//! Declared record fields.

use std::fmt;

/// Field name that marks the identity field by convention.
pub const ID_FIELD_NAME: &str = "ID";

/// Tag value that marks the identity field explicitly.
pub const ID_TAG: &str = "id";

/// Describes one field of a record type.
///
/// Records list their fields in declaration order through
/// [`crate::Model::fields`]. The resolver scans this list to find the
/// identity field: the first field named `"ID"` or tagged `"id"`.
/// Only string fields carry accessors; a generated identifier can only
/// be written into a string field.
///
/// Use the [`string_field!`](crate::string_field) macro for string fields.
pub struct FieldDescriptor<M> {
    name: &'static str,
    tag: Option<&'static str>,
    access: Option<StringAccess<M>>,
}

struct StringAccess<M> {
    get: fn(&M) -> &str,
    set: fn(&mut M, String),
}

impl<M> FieldDescriptor<M> {
    /// Declares a string field with its accessors.
    pub const fn string(name: &'static str, get: fn(&M) -> &str, set: fn(&mut M, String)) -> Self {
        Self {
            name,
            tag: None,
            access: Some(StringAccess { get, set }),
        }
    }

    /// Declares a field that is not a string.
    pub const fn other(name: &'static str) -> Self {
        Self {
            name,
            tag: None,
            access: None,
        }
    }

    /// Attaches a metadata tag value to the field.
    #[must_use]
    pub const fn tagged(mut self, tag: &'static str) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Returns the field name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the metadata tag value, if any.
    pub fn tag(&self) -> Option<&'static str> {
        self.tag
    }

    /// Returns true if the field holds a string.
    pub fn is_string(&self) -> bool {
        self.access.is_some()
    }

    /// Returns true if the field marks the record identity.
    pub fn is_identity(&self) -> bool {
        self.name == ID_FIELD_NAME || self.tag == Some(ID_TAG)
    }

    /// Reads the field from a record. `None` for non-string fields.
    pub fn get<'m>(&self, model: &'m M) -> Option<&'m str> {
        self.access.as_ref().map(|a| (a.get)(model))
    }

    /// Writes the field on a record. Returns false for non-string fields.
    pub fn set(&self, model: &mut M, value: String) -> bool {
        match &self.access {
            Some(a) => {
                (a.set)(model, value);
                true
            }
            None => false,
        }
    }
}

impl<M> Clone for FieldDescriptor<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tag: self.tag,
            access: self.access.as_ref().map(|a| StringAccess {
                get: a.get,
                set: a.set,
            }),
        }
    }
}

impl<M> fmt::Debug for FieldDescriptor<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("string", &self.is_string())
            .finish()
    }
}

/// Declares a string field of a record.
///
/// ```rust
/// use storm_core::{string_field, FieldDescriptor};
///
/// struct Account {
///     email: String,
/// }
///
/// let field: FieldDescriptor<Account> = string_field!(Account, "Email", email).tagged("id");
/// let account = Account { email: "a@b.c".into() };
/// assert_eq!(field.get(&account), Some("a@b.c"));
/// assert!(field.is_identity());
/// ```
#[macro_export]
macro_rules! string_field {
    ($ty:ty, $name:literal, $field:ident) => {
        $crate::FieldDescriptor::<$ty>::string(
            $name,
            |m| m.$field.as_str(),
            |m, v| m.$field = v,
        )
    };
}
