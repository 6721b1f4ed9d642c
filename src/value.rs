//! Typed value codec: lossless conversion between a JSON value and a byte
//! buffer annotated with a [`TypeMarker`].
//!
//! Every JSON type except null has one canonical byte form:
//!
//! | JSON value | Marker | Payload |
//! |---|---|---|
//! | `true`/`false` | `Boolean` | one 0/1 byte |
//! | integer in `i64` | `Long` | 8-byte big-endian two's complement |
//! | other number | `Double` | 8-byte big-endian IEEE-754 |
//! | string | `String` | UTF-8 bytes |
//! | array | `Array` | compact JSON text |
//! | object | `Object` | compact JSON text |
//!
//! Null is never encoded; callers skip the property entirely. Decoding is
//! strict: payload lengths must match exactly and surplus bytes are a
//! format violation.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::TypeMarker;

/// Serializes a JSON value into its marker and canonical payload bytes.
///
/// # Errors
///
/// Returns [`Error::Internal`] for null values (callers must skip those
/// before sealing) and for numbers representable as neither `i64` nor `f64`.
pub fn serialize(value: &Value) -> Result<(TypeMarker, Vec<u8>)> {
    match value {
        Value::Null => Err(Error::Internal("null values are skipped, not serialized".into())),
        Value::Bool(b) => Ok((TypeMarker::Boolean, vec![u8::from(*b)])),
        Value::Number(n) => {
            // Exact i64 first; everything else travels as a double.
            if let Some(long) = n.as_i64() {
                Ok((TypeMarker::Long, long.to_be_bytes().to_vec()))
            } else if let Some(double) = n.as_f64() {
                Ok((TypeMarker::Double, double.to_be_bytes().to_vec()))
            } else {
                Err(Error::Internal(format!("number {n} fits neither i64 nor f64")))
            }
        }
        Value::String(s) => Ok((TypeMarker::String, s.as_bytes().to_vec())),
        Value::Array(_) => Ok((TypeMarker::Array, serde_json::to_vec(value).map_err(|e| Error::Internal(format!("array serialization failed: {e}")))?)),
        Value::Object(_) => Ok((TypeMarker::Object, serde_json::to_vec(value).map_err(|e| Error::Internal(format!("object serialization failed: {e}")))?)),
    }
}

/// Reconstructs a JSON value from its marker and payload bytes.
///
/// `context` names the property path for error messages.
///
/// # Errors
///
/// Returns [`Error::FormatViolation`] for wrong payload lengths, malformed
/// UTF-8, sub-tree text that does not parse, or a sub-tree whose JSON kind
/// contradicts the marker.
pub fn deserialize(marker: TypeMarker, payload: &[u8], context: &str) -> Result<Value> {
    match marker {
        TypeMarker::Null | TypeMarker::Compressed => Err(Error::format(context, format!("marker {marker:?} carries no direct payload"))),
        TypeMarker::Boolean => match payload {
            [0] => Ok(Value::Bool(false)),
            [1] => Ok(Value::Bool(true)),
            [b] => Err(Error::format(context, format!("invalid boolean byte {b:#04x}"))),
            _ => Err(Error::format(context, format!("boolean payload must be 1 byte, got {}", payload.len()))),
        },
        TypeMarker::Long => {
            let bytes: [u8; 8] = payload.try_into().map_err(|_| Error::format(context, format!("long payload must be 8 bytes, got {}", payload.len())))?;
            Ok(Value::Number(i64::from_be_bytes(bytes).into()))
        }
        TypeMarker::Double => {
            let bytes: [u8; 8] = payload.try_into().map_err(|_| Error::format(context, format!("double payload must be 8 bytes, got {}", payload.len())))?;
            let double = f64::from_be_bytes(bytes);
            serde_json::Number::from_f64(double).map(Value::Number).ok_or_else(|| Error::format(context, format!("double {double} is not a JSON number")))
        }
        TypeMarker::String => {
            let s = std::str::from_utf8(payload).map_err(|e| Error::format(context, format!("malformed utf-8 in string payload: {e}")))?;
            Ok(Value::String(s.to_owned()))
        }
        TypeMarker::Array => {
            let value: Value = serde_json::from_slice(payload).map_err(|e| Error::format(context, format!("array payload is not valid JSON: {e}")))?;
            if value.is_array() { Ok(value) } else { Err(Error::format(context, "array marker over non-array payload")) }
        }
        TypeMarker::Object => {
            let value: Value = serde_json::from_slice(payload).map_err(|e| Error::format(context, format!("object payload is not valid JSON: {e}")))?;
            if value.is_object() { Ok(value) } else { Err(Error::format(context, "object marker over non-object payload")) }
        }
    }
}
