//! Capability resolution.
//!
//! Works out, for a record type or instance, which field holds the
//! identity and which collection the record belongs to. The wrapper
//! memoizes the answers; the functions here are pure.

use crate::entity::{FieldDescriptor, Model};
use crate::error::{CoreError, CoreResult};
use std::collections::HashSet;

/// Returns the index of the identity field in `fields`.
///
/// The first field named `"ID"` or tagged `"id"` wins.
pub(crate) fn find_id_field<M>(fields: &[FieldDescriptor<M>]) -> Option<usize> {
    fields.iter().position(FieldDescriptor::is_identity)
}

/// Returns the collection name for a record.
///
/// A non-empty display name wins; otherwise the declared type name.
pub(crate) fn collection_name<M: Model>(model: &M) -> String {
    model
        .as_display_named()
        .map(|named| named.entity_name())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| M::type_name().to_string())
}

/// Checks that a record type's declaration is usable.
///
/// # Errors
///
/// Returns [`CoreError::InvalidModel`] if the type name is empty, or a
/// field name is empty or declared twice.
pub(crate) fn check_declaration<M: Model>(fields: &[FieldDescriptor<M>]) -> CoreResult<()> {
    if M::type_name().is_empty() {
        return Err(CoreError::invalid_model("type name is empty"));
    }
    let mut seen = HashSet::new();
    for field in fields {
        if field.name().is_empty() {
            return Err(CoreError::invalid_model(format!(
                "{} declares a field with an empty name",
                M::type_name()
            )));
        }
        if !seen.insert(field.name()) {
            return Err(CoreError::invalid_model(format!(
                "{} declares field {} twice",
                M::type_name(),
                field.name()
            )));
        }
    }
    Ok(())
}
