//! Persistence engine: registry, index maintenance, relations and the
//! commit path, all over a [`store::CommandExecutor`].

pub mod commit;
pub mod index;
pub mod key;
pub mod query;
pub mod registry;
pub mod relation;
pub mod session;
pub mod state;
pub mod store;


// re-exports
pub use index::{IndexError, IndexOp};
pub use key::KeyError;
pub use query::QueryError;
pub use registry::{Collection, Registry, RegistryError};
pub use relation::{Relation, RelationError};
pub use session::Session;
pub use state::RecordState;
pub use store::{Command, CommandExecutor, MemoryStore, StoreError};
