//! # storm codec
//!
//! Record encoding for storm.
//!
//! Backends are opaque byte stores, so every record crosses the backend
//! boundary as CBOR produced here. Any `serde` type can be encoded; struct
//! fields become a CBOR map keyed by field name, which is what lets
//! backends evaluate query filters without knowing the record type.
//!
//! ## Usage
//!
//! ```
//! use storm_codec::{decode_value, from_cbor, to_cbor, Value};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Note {
//!     title: String,
//!     stars: i64,
//! }
//!
//! let note = Note { title: "hello".into(), stars: 3 };
//! let bytes = to_cbor(&note).unwrap();
//!
//! let back: Note = from_cbor(&bytes).unwrap();
//! assert_eq!(back, note);
//!
//! let value = decode_value(&bytes).unwrap();
//! assert_eq!(value.get("stars"), Some(&Value::Integer(3)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{decode_value, from_cbor};
pub use encoder::to_cbor;
pub use error::{CodecError, CodecResult};
pub use value::Value;
