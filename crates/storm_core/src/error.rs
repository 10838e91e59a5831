//! Error types for storm core.

use std::fmt;
use storm_backend::BackendError;
use storm_codec::CodecError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Error type returned by record capabilities (validation and hooks).
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by record capabilities.
pub type HookResult = Result<(), HookError>;

/// The lifecycle hook that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// Runs after a successful save.
    AfterSave,
    /// Runs after a successful cache write.
    AfterCache,
    /// Runs after a successful cache removal.
    AfterUncache,
    /// Runs after a successful delete.
    AfterDelete,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HookKind::AfterSave => "after-save",
            HookKind::AfterCache => "after-cache",
            HookKind::AfterUncache => "after-uncache",
            HookKind::AfterDelete => "after-delete",
        };
        f.write_str(s)
    }
}

/// Errors that can occur in storm core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No execution context is bound to the wrapper.
    #[error("no context was bound")]
    NoContext,

    /// No record is bound to the wrapper.
    #[error("model is not loaded")]
    NoModel,

    /// A record was required but none was given.
    #[error("model is nil")]
    NilModel,

    /// The record type's declared shape is unusable.
    #[error("invalid model: {reason}")]
    InvalidModel {
        /// What is wrong with the declaration.
        reason: String,
    },

    /// The record has neither an identity field nor an identity capability.
    #[error("Type {type_name} has no ID field")]
    NoIdField {
        /// Declared type name of the record.
        type_name: String,
    },

    /// The entropy source could not supply bytes for a new identifier.
    #[error("random source failed: {message}")]
    RandomSource {
        /// Description of the failure.
        message: String,
    },

    /// The record's self-validation rejected the save.
    #[error("validation failed: {0}")]
    Validation(#[source] HookError),

    /// A lifecycle hook failed.
    #[error("{hook} hook failed: {source}")]
    Hook {
        /// Which hook failed.
        hook: HookKind,
        /// The hook's own error.
        #[source]
        source: HookError,
    },

    /// A query was built with a malformed predicate.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Description of the problem.
        message: String,
    },

    /// Backend error, passed through unchanged.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Record encoding error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl CoreError {
    /// Creates an invalid model error.
    pub fn invalid_model(reason: impl Into<String>) -> Self {
        Self::InvalidModel {
            reason: reason.into(),
        }
    }

    /// Creates a missing identity field error.
    pub fn no_id_field(type_name: impl Into<String>) -> Self {
        Self::NoIdField {
            type_name: type_name.into(),
        }
    }

    /// Creates a random source error.
    pub fn random_source(message: impl Into<String>) -> Self {
        Self::RandomSource {
            message: message.into(),
        }
    }

    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Returns true if the durable store reported the entity as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_not_found())
    }

    /// Returns true if the cache reported a miss.
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_cache_miss())
    }
}
