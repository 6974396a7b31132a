use crate::{
    db::{
        index::IndexError, key::KeyError, query::QueryError, registry::RegistryError,
        relation::RelationError, store::StoreError,
    },
    model::CompileError,
    value::CodecError,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Top-level error of every public operation. Layer errors pass through
/// unchanged; [`Error::class`] gives the stable classification.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Relation(#[from] RelationError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{type_name} '{id}' not found")]
    NotFound { type_name: String, id: String },
}

impl Error {
    pub fn not_found(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Compile(_) => ErrorClass::Compile,
            Self::Registry(err) => err.class(),
            Self::Relation(err) => err.class(),
            Self::Query(_) => ErrorClass::Usage,
            Self::Key(_) => ErrorClass::Validation,
            Self::Index(_) => ErrorClass::InvariantViolation,
            Self::Codec(err) => match err {
                CodecError::InvalidScalar { .. } | CodecError::InvalidList(_) => {
                    ErrorClass::Corruption
                }
                CodecError::TypeMismatch { .. } | CodecError::UnknownField { .. } => {
                    ErrorClass::InvariantViolation
                }
            },
            Self::Store(_) => ErrorClass::Storage,
            Self::NotFound { .. } => ErrorClass::NotFound,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}: {self}", self.class())
    }
}

///
/// ErrorClass
/// Runtime classification of an [`Error`].
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// A record definition was rejected at registration.
    Compile,
    /// Record content failed a save-time check; nothing was written.
    Validation,
    NotFound,
    /// The operation is declared but deliberately unimplemented.
    Unsupported,
    /// The caller asked for something the registered schema does not have.
    Usage,
    /// The store or its connection failed.
    Storage,
    /// A `Record` implementation disagrees with its own definition.
    InvariantViolation,
    /// Stored data cannot be decoded.
    Corruption,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Compile => "compile",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Unsupported => "unsupported",
            Self::Usage => "usage",
            Self::Storage => "storage",
            Self::InvariantViolation => "invariant_violation",
            Self::Corruption => "corruption",
        };
        write!(f, "{label}")
    }
}
