//! # storm testkit
//!
//! Test utilities for storm.
//!
//! This crate provides:
//! - Counting and failing backend doubles, and random-source doubles
//! - Shared record types with identity fields, display names and hooks
//! - Orchestrator fixtures over instrumented backends
//! - Property-based test generators using proptest
//! - Stress runs over one orchestrator
//!
//! ## Usage
//!
//! ```rust
//! use storm_testkit::prelude::*;
//!
//! with_test_storm(|storm| {
//!     let mut note = Note::new("bar");
//!     storm.model(&mut note).with_context(storm.ctx()).save().unwrap();
//!     assert_eq!(storm.store.counts().writes(), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod doubles;
pub mod fixtures;
pub mod generators;
pub mod records;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::doubles::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::records::*;
    pub use crate::stress::*;
}

pub use doubles::*;
pub use fixtures::*;
pub use generators::*;
pub use records::*;
pub use stress::*;
