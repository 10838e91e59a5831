//! CBOR encoder.

use crate::error::{CodecError, CodecResult};
use serde::Serialize;

/// Encode any serializable value to CBOR bytes.
///
/// Struct fields are written in declaration order, so encoding the same
/// record twice yields identical bytes.
///
/// # Errors
///
/// Returns an error if the value's `Serialize` implementation fails.
pub fn to_cbor<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    let mut buffer = Vec::new();
    ciborium::ser::into_writer(value, &mut buffer)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_integer_is_one_byte() {
        assert_eq!(to_cbor(&5u8).unwrap(), vec![0x05]);
    }

    #[test]
    fn text_has_major_type_three() {
        let bytes = to_cbor("hi").unwrap();
        assert_eq!(bytes, vec![0x62, b'h', b'i']);
    }
}
