//! Property-based test generators using proptest.
//!
//! Provides strategies for generating records and query inputs that
//! maintain the invariants the orchestrator expects.

use crate::records::{Note, Person};
use proptest::prelude::*;
use storm_core::EntityId;

/// Strategy for generating entity IDs.
pub fn entity_id_strategy() -> impl Strategy<Value = EntityId> {
    prop::array::uniform16(any::<u8>()).prop_map(EntityId::from_bytes)
}

/// Strategy for generating caller-chosen identifiers.
pub fn identifier_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9][a-zA-Z0-9_-]{0,31}").expect("Invalid regex")
}

/// Strategy for generating collection names.
pub fn collection_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,31}").expect("Invalid regex")
}

/// Strategy for generating notes without an identifier.
pub fn note_strategy() -> impl Strategy<Value = Note> {
    ".{0,64}".prop_map(Note::new)
}

/// Strategy for generating people without an identifier.
pub fn person_strategy() -> impl Strategy<Value = Person> {
    ("[a-z]{1,12}", 0i64..120).prop_map(|(name, age)| Person::new(name, age))
}

/// An operation against one wrapped record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperOperation {
    /// Save the record.
    Save,
    /// Load the record.
    Load,
    /// Write the record to the cache.
    Cache,
    /// Remove the record from the cache.
    Uncache,
    /// Delete the record.
    Delete,
}

/// Strategy for generating wrapper operations.
pub fn wrapper_operation_strategy() -> impl Strategy<Value = WrapperOperation> {
    prop_oneof![
        3 => Just(WrapperOperation::Save),
        3 => Just(WrapperOperation::Load),
        1 => Just(WrapperOperation::Cache),
        1 => Just(WrapperOperation::Uncache),
        1 => Just(WrapperOperation::Delete),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<WrapperOperation>> {
    prop::collection::vec(wrapper_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
