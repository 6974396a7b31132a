//! Typed records over a key-value store.
//!
//! Record types describe themselves once ([`model::RecordDef`]), are compiled
//! into a [`model::ModelSpec`] at registration, and are then saved, loaded and
//! deleted through a [`db::Session`]. Secondary indexes and relation checks
//! are maintained as a side effect of every write.

pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod traits;
pub mod value;

#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// CONSTANTS
///

/// Separator between the segments of every storage key.
pub const KEY_SEPARATOR: char = ':';

///
/// Prelude
///
/// Names most callers need to declare, register and persist records.
///

pub mod prelude {
    pub use crate::{
        db::{Collection, CommandExecutor, MemoryStore, Registry, Session},
        error::{Error, ErrorClass},
        model::{FieldDef, RecordDef},
        traits::Record,
        value::{CodecError, FieldValue, ScalarKind, Value},
    };
}

// re-exports
pub use error::{Error, ErrorClass};
