//! String codec for stored field values.
//!
//! Every hash field in the store is a string. Scalars round-trip losslessly:
//! bools as `1`/`0`, integers in decimal, floats in Rust's shortest
//! round-trip form, text verbatim. Id lists are stored as a JSON array.

use crate::value::{ScalarKind, Value};
use thiserror::Error as ThisError;

///
/// CodecError
///

#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error("cannot decode '{raw}' as {kind}")]
    InvalidScalar { kind: ScalarKind, raw: String },

    #[error("cannot decode id list: {0}")]
    InvalidList(#[from] serde_json::Error),

    #[error("field '{field}' cannot hold value {found:?}")]
    TypeMismatch { field: String, found: Value },

    #[error("record has no field '{field}'")]
    UnknownField { field: String },
}

impl CodecError {
    /// Error for a `Record::set_value` call that received an incompatible value.
    pub fn mismatch(field: impl Into<String>, found: Value) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            found,
        }
    }

    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
        }
    }
}

/// Encode a value for storage. `Null` has no stored form.
pub fn encode(value: &Value) -> Result<Option<String>, CodecError> {
    let encoded = match value {
        Value::Null => return Ok(None),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Int(v) => v.to_string(),
        Value::Uint(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Text(v) => v.clone(),
        Value::List(ids) => serde_json::to_string(ids)?,
    };

    Ok(Some(encoded))
}

/// Decode a stored scalar.
pub fn decode(kind: ScalarKind, raw: &str) -> Result<Value, CodecError> {
    let invalid = || CodecError::InvalidScalar {
        kind,
        raw: raw.to_string(),
    };

    let value = match kind {
        ScalarKind::Bool => match raw {
            "1" | "true" => Value::Bool(true),
            "0" | "false" => Value::Bool(false),
            _ => return Err(invalid()),
        },
        ScalarKind::Int => Value::Int(raw.parse().map_err(|_| invalid())?),
        ScalarKind::Uint => Value::Uint(raw.parse().map_err(|_| invalid())?),
        ScalarKind::Float => Value::Float(raw.parse().map_err(|_| invalid())?),
        ScalarKind::Text => Value::Text(raw.to_string()),
    };

    Ok(value)
}

/// Decode a stored id list.
pub fn decode_list(raw: &str) -> Result<Value, CodecError> {
    Ok(Value::List(serde_json::from_str(raw)?))
}
