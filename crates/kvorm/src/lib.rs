//! ## Crate layout
//! - `config`: TOML-backed settings for id generation and observability.
//! - `core`: record model, spec compiler, index engine, relations and sessions.
//!
//! The `prelude` module carries everything needed to declare a record type,
//! register it, and save or load it through a session.

pub use kvorm_config as config;
pub use kvorm_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use kvorm_core::{Error, ErrorClass, db, model, obs};

///
/// Prelude
///

pub mod prelude {
    pub use kvorm_config::{IdStrategy, KvormConfig};
    pub use kvorm_core::prelude::*;
}

///
/// TESTS
///
