//! CBOR decoder.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use serde::de::DeserializeOwned;

/// Decode a typed value from CBOR bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid CBOR or do not match the
/// shape of `T`.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    ciborium::de::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
}

/// Decode CBOR bytes into a dynamic [`Value`].
///
/// Backends use this to look at record fields without knowing the
/// record type.
///
/// # Errors
///
/// Returns an error if the bytes are not valid CBOR, or contain integers
/// outside the `i64` range.
pub fn decode_value(bytes: &[u8]) -> CodecResult<Value> {
    let raw: ciborium::Value =
        ciborium::de::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))?;
    convert(raw)
}

fn convert(raw: ciborium::Value) -> CodecResult<Value> {
    match raw {
        ciborium::Value::Null => Ok(Value::Null),
        ciborium::Value::Bool(b) => Ok(Value::Bool(b)),
        ciborium::Value::Integer(n) => i64::try_from(i128::from(n))
            .map(Value::Integer)
            .map_err(|_| CodecError::IntegerOverflow),
        ciborium::Value::Float(f) => Ok(Value::Float(f)),
        ciborium::Value::Bytes(b) => Ok(Value::Bytes(b)),
        ciborium::Value::Text(s) => Ok(Value::Text(s)),
        ciborium::Value::Array(items) => items
            .into_iter()
            .map(convert)
            .collect::<CodecResult<Vec<_>>>()
            .map(Value::Array),
        ciborium::Value::Map(pairs) => pairs
            .into_iter()
            .map(|(k, v)| Ok((convert(k)?, convert(v)?)))
            .collect::<CodecResult<Vec<_>>>()
            .map(Value::Map),
        // Tags carry no meaning for field lookup.
        ciborium::Value::Tag(_, inner) => convert(*inner),
        other => Err(CodecError::unsupported_type(format!("{other:?}"))),
    }
}
