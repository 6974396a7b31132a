//! Command executor boundary.
//!
//! The engine decides *what* to write; an executor talks to the store.
//! Reads are single commands. Every write goes through [`CommandExecutor::execute`],
//! which must apply the whole batch or none of it, with no partial state
//! visible to other clients.

mod memory;

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
};
use thiserror::Error as ThisError;

// re-exports
pub use memory::MemoryStore;

///
/// StoreError
///
/// Opaque executor failure. The engine propagates it unchanged and never
/// retries.
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("operation against a key holding the wrong kind of value: {key}")]
    WrongType { key: String },

    #[error("value at key '{key}' is not an integer")]
    NotAnInteger { key: String },

    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wrap a backend-specific failure.
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }
}

///
/// Command
///
/// One write command in an atomic batch.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    HashSet {
        key: String,
        fields: Vec<(String, String)>,
    },
    HashDelete {
        key: String,
        fields: Vec<String>,
    },
    Delete {
        key: String,
    },
    SetAdd {
        key: String,
        member: String,
    },
    SetRemove {
        key: String,
        member: String,
    },
    SortedSetAdd {
        key: String,
        member: String,
        score: f64,
    },
    SortedSetRemove {
        key: String,
        member: String,
    },
}

impl Command {
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::HashSet { key, .. }
            | Self::HashDelete { key, .. }
            | Self::Delete { key }
            | Self::SetAdd { key, .. }
            | Self::SetRemove { key, .. }
            | Self::SortedSetAdd { key, .. }
            | Self::SortedSetRemove { key, .. } => key,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HashSet { key, fields } => {
                write!(f, "HSET {key}")?;
                for (field, value) in fields {
                    write!(f, " {field} {value:?}")?;
                }
                Ok(())
            }
            Self::HashDelete { key, fields } => write!(f, "HDEL {key} {}", fields.join(" ")),
            Self::Delete { key } => write!(f, "DEL {key}"),
            Self::SetAdd { key, member } => write!(f, "SADD {key} {member}"),
            Self::SetRemove { key, member } => write!(f, "SREM {key} {member}"),
            Self::SortedSetAdd { key, member, score } => write!(f, "ZADD {key} {score} {member}"),
            Self::SortedSetRemove { key, member } => write!(f, "ZREM {key} {member}"),
        }
    }
}

///
/// CommandExecutor
///

pub trait CommandExecutor {
    /// All fields of a hash, or `None` when the key does not exist.
    fn hash_get_all(&self, key: &str) -> Result<Option<BTreeMap<String, String>>, StoreError>;

    fn exists(&self, key: &str) -> Result<bool, StoreError>;

    fn set_members(&self, key: &str) -> Result<BTreeSet<String>, StoreError>;

    fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Members with `min <= score <= max`, ascending by score then member.
    fn sorted_range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<String>, StoreError>;

    /// Atomically increment an integer key, returning the new value.
    fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Apply every command or none of them.
    fn execute(&self, batch: &[Command]) -> Result<(), StoreError>;
}

// forward the executor through shared references and handles
macro_rules! forward_executor {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<T: CommandExecutor + ?Sized> CommandExecutor for $ty {
                fn hash_get_all(
                    &self,
                    key: &str,
                ) -> Result<Option<BTreeMap<String, String>>, StoreError> {
                    (**self).hash_get_all(key)
                }

                fn exists(&self, key: &str) -> Result<bool, StoreError> {
                    (**self).exists(key)
                }

                fn set_members(&self, key: &str) -> Result<BTreeSet<String>, StoreError> {
                    (**self).set_members(key)
                }

                fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError> {
                    (**self).set_contains(key, member)
                }

                fn sorted_range_by_score(
                    &self,
                    key: &str,
                    min: f64,
                    max: f64,
                ) -> Result<Vec<String>, StoreError> {
                    (**self).sorted_range_by_score(key, min, max)
                }

                fn incr(&self, key: &str) -> Result<i64, StoreError> {
                    (**self).incr(key)
                }

                fn execute(&self, batch: &[Command]) -> Result<(), StoreError> {
                    (**self).execute(batch)
                }
            }
        )*
    };
}

forward_executor!(&T, Arc<T>, Box<T>);
