//! Record metadata.
//!
//! - `def` is what a record type *declares* (a builder-made field table),
//! - `spec` and `field` are what the engine *runs on* (compiled, immutable),
//! - `compile` is the one-way bridge between the two.

pub mod compile;
pub mod def;
pub mod field;
pub mod spec;

#[cfg(test)]
mod tests;

// re-exports
pub use compile::{CompileError, compile};
pub use def::{FieldDef, FieldShape, RecordDef};
pub use field::{Cardinality, FieldKind, FieldSpec, RelationSpec};
pub use spec::ModelSpec;
