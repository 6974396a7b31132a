//! Exact-match and numeric range lookups over declared indexes.

use crate::{
    db::key::{range_index_key, value_index_key},
    error::Error,
    model::{FieldSpec, ModelSpec},
    value::{Value, encode},
};
use thiserror::Error as ThisError;

///
/// QueryError
///

#[derive(Debug, PartialEq, ThisError)]
pub enum QueryError {
    #[error("type '{type_name}' has no field '{field}'")]
    UnknownField { type_name: String, field: String },

    #[error("{type_name}.{field} is not indexed")]
    FieldNotIndexed { type_name: String, field: String },

    #[error("{type_name}.{field} is not numeric; range lookups need a numeric index")]
    NotNumeric { type_name: String, field: String },

    #[error("{type_name}.{field} cannot be looked up by {found:?}")]
    UnmatchableValue {
        type_name: String,
        field: String,
        found: Value,
    },
}

/// Set key holding the ids whose `field` equals `value`.
pub fn value_lookup_key(spec: &ModelSpec, field: &str, value: &Value) -> Result<String, Error> {
    let field_spec = indexed_field(spec, field)?;

    // Null never has a membership, and a value of the wrong kind never matches.
    let encoded = if field_spec.accepts(value) {
        encode(value)?
    } else {
        None
    };
    let encoded = encoded.ok_or_else(|| QueryError::UnmatchableValue {
        type_name: spec.type_name.clone(),
        field: field.to_string(),
        found: value.clone(),
    })?;

    Ok(value_index_key(
        &spec.type_name,
        &field_spec.storage_name,
        &encoded,
    ))
}

/// Sorted-set key ranking ids by the numeric `field`.
pub fn range_lookup_key(spec: &ModelSpec, field: &str) -> Result<String, QueryError> {
    let field_spec = indexed_field(spec, field)?;

    if !field_spec.scalar_kind().is_some_and(|kind| kind.is_numeric()) {
        return Err(QueryError::NotNumeric {
            type_name: spec.type_name.clone(),
            field: field.to_string(),
        });
    }

    Ok(range_index_key(&spec.type_name, &field_spec.storage_name))
}

// Look up an indexed field by struct name.
fn indexed_field<'a>(spec: &'a ModelSpec, field: &str) -> Result<&'a FieldSpec, QueryError> {
    let field_spec = spec.field(field).ok_or_else(|| QueryError::UnknownField {
        type_name: spec.type_name.clone(),
        field: field.to_string(),
    })?;

    if !field_spec.indexed {
        return Err(QueryError::FieldNotIndexed {
            type_name: spec.type_name.clone(),
            field: field.to_string(),
        });
    }

    Ok(field_spec)
}

///
/// TESTS
///
