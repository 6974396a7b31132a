//! Module: index
//! Responsibility: derive secondary-index mutations from record state transitions.
//! Does not own: executing commands or reading prior state.
//! Boundary: commit preparation turns the returned ops into store commands.

#[cfg(test)]
mod tests;

use crate::{
    db::{
        key::{range_index_key, value_index_key},
        state::RecordState,
        store::Command,
    },
    model::{FieldSpec, ModelSpec},
    value::{CodecError, Value, encode},
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// IndexError
///

#[derive(Debug, ThisError)]
pub enum IndexError {
    #[error("{type_name}.{field}: indexed value missing from record state")]
    MissingValue { type_name: String, field: String },

    #[error("{type_name}.{field}: value {found:?} does not match the field kind")]
    KindMismatch {
        type_name: String,
        field: String,
        found: Value,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

///
/// IndexOp
///
/// One secondary-index mutation. Keys are fully formed storage keys; the
/// member is always a record id.
///

#[derive(Clone, Debug, PartialEq)]
pub enum IndexOp {
    AddToSet {
        key: String,
        member: String,
    },
    RemoveFromSet {
        key: String,
        member: String,
    },
    AddToSortedSet {
        key: String,
        member: String,
        score: f64,
    },
    RemoveFromSortedSet {
        key: String,
        member: String,
    },
}

impl IndexOp {
    #[must_use]
    pub const fn is_insert(&self) -> bool {
        matches!(self, Self::AddToSet { .. } | Self::AddToSortedSet { .. })
    }
}

impl fmt::Display for IndexOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Command::from(self.clone()), f)
    }
}

impl From<IndexOp> for Command {
    fn from(op: IndexOp) -> Self {
        match op {
            IndexOp::AddToSet { key, member } => Self::SetAdd { key, member },
            IndexOp::RemoveFromSet { key, member } => Self::SetRemove { key, member },
            IndexOp::AddToSortedSet { key, member, score } => {
                Self::SortedSetAdd { key, member, score }
            }
            IndexOp::RemoveFromSortedSet { key, member } => Self::SortedSetRemove { key, member },
        }
    }
}

///
/// Membership
///
/// Index entries one field value contributes.
///

#[derive(Clone, Debug, PartialEq)]
struct Membership {
    encoded: String,
    score: Option<f64>,
}

/// Index mutations for saving `new` over `old`.
///
/// Stale memberships of changed values are removed first; memberships for
/// every current value are then added, changed or not, so a save also repairs
/// an index entry that went missing.
pub fn index_mutations_for_save(
    spec: &ModelSpec,
    old: Option<&RecordState>,
    new: &RecordState,
) -> Result<Vec<IndexOp>, IndexError> {
    let mut removes = Vec::new();
    let mut inserts = Vec::new();

    for field in spec.indexed_fields() {
        let current = membership(spec, field, new)?;

        if let Some(old) = old
            && let Some(stale) = membership(spec, field, old)?
            && current.as_ref() != Some(&stale)
        {
            push_removes(&mut removes, spec, field, &old.id, &stale);
        }

        if let Some(current) = current {
            let member = &new.id;
            inserts.push(IndexOp::AddToSet {
                key: value_index_key(&spec.type_name, &field.storage_name, &current.encoded),
                member: member.clone(),
            });
            if let Some(score) = current.score {
                inserts.push(IndexOp::AddToSortedSet {
                    key: range_index_key(&spec.type_name, &field.storage_name),
                    member: member.clone(),
                    score,
                });
            }
        }
    }

    removes.extend(inserts);

    Ok(removes)
}

/// Index mutations removing every membership of a deleted record.
pub fn index_mutations_for_delete(
    spec: &ModelSpec,
    state: &RecordState,
) -> Result<Vec<IndexOp>, IndexError> {
    let mut removes = Vec::new();

    for field in spec.indexed_fields() {
        if let Some(stale) = membership(spec, field, state)? {
            push_removes(&mut removes, spec, field, &state.id, &stale);
        }
    }

    Ok(removes)
}

fn push_removes(
    ops: &mut Vec<IndexOp>,
    spec: &ModelSpec,
    field: &FieldSpec,
    id: &str,
    stale: &Membership,
) {
    ops.push(IndexOp::RemoveFromSet {
        key: value_index_key(&spec.type_name, &field.storage_name, &stale.encoded),
        member: id.to_string(),
    });
    if stale.score.is_some() {
        ops.push(IndexOp::RemoveFromSortedSet {
            key: range_index_key(&spec.type_name, &field.storage_name),
            member: id.to_string(),
        });
    }
}

// Resolve one indexed field of a state; `None` for a null pointer.
fn membership(
    spec: &ModelSpec,
    field: &FieldSpec,
    state: &RecordState,
) -> Result<Option<Membership>, IndexError> {
    let value = state
        .get(&field.struct_name)
        .ok_or_else(|| IndexError::MissingValue {
            type_name: spec.type_name.clone(),
            field: field.struct_name.clone(),
        })?;

    if !field.accepts(value) || field.scalar_kind().is_none() {
        return Err(IndexError::KindMismatch {
            type_name: spec.type_name.clone(),
            field: field.struct_name.clone(),
            found: value.clone(),
        });
    }

    let Some(encoded) = encode(value)? else {
        return Ok(None);
    };

    Ok(Some(Membership {
        encoded,
        score: value.as_score(),
    }))
}
