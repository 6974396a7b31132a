//! Module: relation
//! Responsibility: alias lookup over relational fields and save-time reference checks.
//! Does not own: loading or decoding the related record.
//! Boundary: the session fetches targets once a relation is resolved here.

mod validate;


use crate::{
    db::state::RecordState,
    error::ErrorClass,
    model::{Cardinality, ModelSpec},
    value::Value,
};
use thiserror::Error as ThisError;

// re-exports
pub use validate::validate_relations;

///
/// RelationError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum RelationError {
    #[error("type '{type_name}' declares no relation '{alias}'")]
    NotDeclared { type_name: String, alias: String },

    #[error("{type_name}.{alias}: has-many relations cannot be fetched (not implemented)")]
    NotImplemented { type_name: String, alias: String },

    #[error("{type_name}.{field}: relation target '{target}' is not a registered type")]
    UnregisteredType {
        type_name: String,
        field: String,
        target: String,
    },

    #[error("{type_name}.{field}: referenced {target} '{id}' does not exist")]
    DanglingReference {
        type_name: String,
        field: String,
        target: String,
        id: String,
    },

    #[error("relation '{alias}' points at '{target}', not '{requested}'")]
    TargetTypeMismatch {
        alias: String,
        target: String,
        requested: String,
    },
}

impl RelationError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::UnregisteredType { .. } | Self::DanglingReference { .. } => {
                ErrorClass::Validation
            }
            Self::NotDeclared { .. } | Self::TargetTypeMismatch { .. } => ErrorClass::Usage,
            Self::NotImplemented { .. } => ErrorClass::Unsupported,
        }
    }
}

///
/// Relation
/// A resolved single reference: target type plus referenced id.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Relation {
    pub target: String,
    pub id: String,
}

/// Resolve a has-one relation of `state` by alias.
///
/// `Ok(None)` means the relation is declared but unset. An alias no field
/// declares is an error, never a silent `None`.
pub fn resolve(
    spec: &ModelSpec,
    state: &RecordState,
    alias: &str,
) -> Result<Option<Relation>, RelationError> {
    let (field, relation) = spec
        .relation_field(alias)
        .and_then(|field| field.relation().map(|relation| (field, relation)))
        .ok_or_else(|| RelationError::NotDeclared {
            type_name: spec.type_name.clone(),
            alias: alias.to_string(),
        })?;

    if relation.cardinality == Cardinality::Many {
        return Err(RelationError::NotImplemented {
            type_name: spec.type_name.clone(),
            alias: alias.to_string(),
        });
    }

    let id = match state.get(&field.struct_name) {
        Some(Value::Text(id)) if !id.is_empty() => id.clone(),
        _ => return Ok(None),
    };

    Ok(Some(Relation {
        target: relation.target.clone(),
        id,
    }))
}

/// Error for fetching a has-many relation, which is declared but not provided.
#[must_use]
pub fn unsupported_has_many(spec: &ModelSpec, alias: &str) -> RelationError {
    let declared = spec
        .relation_field(alias)
        .and_then(|field| field.relation())
        .is_some();

    if declared {
        RelationError::NotImplemented {
            type_name: spec.type_name.clone(),
            alias: alias.to_string(),
        }
    } else {
        RelationError::NotDeclared {
            type_name: spec.type_name.clone(),
            alias: alias.to_string(),
        }
    }
}
