//! Storage key layout.
//!
//! ```text
//! <type>:<id>                 hash   storage_name -> encoded value
//! <type>:all                  set    every persisted id
//! <type>:<storage>:<value>    set    ids whose field encodes to <value>
//! <type>:<storage>            zset   id -> numeric field value
//! <type>:next_id              string id counter (sequence strategy only)
//! ```

use crate::{KEY_SEPARATOR, model::ModelSpec};
use thiserror::Error as ThisError;

/// Suffix of the per-type membership set.
pub const ALL_SUFFIX: &str = "all";

/// Suffix of the per-type id counter.
pub const SEQUENCE_SUFFIX: &str = "next_id";

///
/// KeyError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum KeyError {
    #[error("{type_name} id '{id}' contains the key separator")]
    Separator { type_name: String, id: String },

    #[error("{type_name} id '{id}' collides with a reserved key")]
    Reserved { type_name: String, id: String },
}

#[must_use]
pub fn record_key(type_name: &str, id: &str) -> String {
    format!("{type_name}{KEY_SEPARATOR}{id}")
}

#[must_use]
pub fn all_key(type_name: &str) -> String {
    record_key(type_name, ALL_SUFFIX)
}

#[must_use]
pub fn sequence_key(type_name: &str) -> String {
    record_key(type_name, SEQUENCE_SUFFIX)
}

#[must_use]
pub fn range_index_key(type_name: &str, storage_name: &str) -> String {
    record_key(type_name, storage_name)
}

#[must_use]
pub fn value_index_key(type_name: &str, storage_name: &str, encoded: &str) -> String {
    format!("{type_name}{KEY_SEPARATOR}{storage_name}{KEY_SEPARATOR}{encoded}")
}

/// Reject caller-supplied ids whose record key would alias another key of the
/// same type.
pub fn validate_id(spec: &ModelSpec, id: &str) -> Result<(), KeyError> {
    if id.contains(KEY_SEPARATOR) {
        return Err(KeyError::Separator {
            type_name: spec.type_name.clone(),
            id: id.to_string(),
        });
    }

    let reserved = id == ALL_SUFFIX
        || id == SEQUENCE_SUFFIX
        || spec
            .fields
            .iter()
            .any(|f| f.indexed && f.storage_name == id);
    if reserved {
        return Err(KeyError::Reserved {
            type_name: spec.type_name.clone(),
            id: id.to_string(),
        });
    }

    Ok(())
}

///
/// TESTS
///
