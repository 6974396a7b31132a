use crate::{
    db::key::{all_key, record_key},
    error::{Error, ErrorClass},
    model::{ModelSpec, compile},
    traits::Record,
};
use std::{
    any::TypeId,
    collections::{BTreeMap, HashMap},
    fmt,
    marker::PhantomData,
    sync::Arc,
};
use thiserror::Error as ThisError;

///
/// RegistryError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum RegistryError {
    #[error("type '{type_name}' describes itself as '{described}'")]
    TypeNameMismatch { type_name: String, described: String },

    #[error("type name '{type_name}' is already registered by another record type")]
    NameTaken { type_name: String },

    #[error("type '{type_name}' is not registered")]
    Unregistered { type_name: String },
}

impl RegistryError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::TypeNameMismatch { .. } | Self::NameTaken { .. } => ErrorClass::Compile,
            Self::Unregistered { .. } => ErrorClass::Usage,
        }
    }
}

///
/// Registry
///
/// Owned table of compiled specs, one per record type. Built up front,
/// then shared read-only with every session.
///

#[derive(Debug, Default)]
pub struct Registry {
    specs: BTreeMap<String, Arc<ModelSpec>>,
    types: HashMap<TypeId, String>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and register `R`. Registering the same type again returns the
    /// cached collection without recompiling.
    pub fn register<R: Record>(&mut self) -> Result<Collection<R>, Error> {
        let type_id = TypeId::of::<R>();
        if self.types.contains_key(&type_id) {
            return self.collection::<R>();
        }
        if self.specs.contains_key(R::TYPE_NAME) {
            return Err(RegistryError::NameTaken {
                type_name: R::TYPE_NAME.to_string(),
            }
            .into());
        }

        let def = R::describe();
        if def.type_name != R::TYPE_NAME {
            return Err(RegistryError::TypeNameMismatch {
                type_name: R::TYPE_NAME.to_string(),
                described: def.type_name.to_string(),
            }
            .into());
        }

        // No partial spec is stored when compilation fails.
        let spec = Arc::new(compile(&def)?);
        self.specs.insert(spec.type_name.clone(), Arc::clone(&spec));
        self.types.insert(type_id, spec.type_name.clone());

        tracing::debug!(type_name = R::TYPE_NAME, "registered record type");

        Ok(Collection::new(spec))
    }

    /// Typed handle for an already registered type.
    pub fn collection<R: Record>(&self) -> Result<Collection<R>, Error> {
        Ok(Collection::new(Arc::clone(self.spec_for::<R>()?)))
    }

    pub fn spec_for<R: Record>(&self) -> Result<&Arc<ModelSpec>, RegistryError> {
        self.types
            .get(&TypeId::of::<R>())
            .and_then(|name| self.specs.get(name))
            .ok_or_else(|| RegistryError::Unregistered {
                type_name: R::TYPE_NAME.to_string(),
            })
    }

    pub fn spec(&self, type_name: &str) -> Result<&Arc<ModelSpec>, RegistryError> {
        self.specs
            .get(type_name)
            .ok_or_else(|| RegistryError::Unregistered {
                type_name: type_name.to_string(),
            })
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.specs.contains_key(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }
}

///
/// Collection
///
/// Binding between a record type and its compiled spec.
///

pub struct Collection<R> {
    spec: Arc<ModelSpec>,
    _marker: PhantomData<fn() -> R>,
}

impl<R> Collection<R> {
    const fn new(spec: Arc<ModelSpec>) -> Self {
        Self {
            spec,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.spec.type_name
    }

    #[must_use]
    pub const fn spec(&self) -> &Arc<ModelSpec> {
        &self.spec
    }

    #[must_use]
    pub fn record_key(&self, id: &str) -> String {
        record_key(&self.spec.type_name, id)
    }

    #[must_use]
    pub fn all_key(&self) -> String {
        all_key(&self.spec.type_name)
    }
}

impl<R> Clone for Collection<R> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.spec))
    }
}

impl<R> fmt::Debug for Collection<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("type_name", &self.spec.type_name)
            .finish()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{FieldDef, RecordDef},
        test_fixtures::{BasicModel, Person},
        value::{CodecError, Value},
    };

    #[derive(Debug, Default)]
    struct Impostor {
        id: String,
    }

    impl Record for Impostor {
        const TYPE_NAME: &'static str = "Person";

        fn describe() -> RecordDef {
            RecordDef::new("Person").identity("Id")
        }

        fn id(&self) -> &str {
            &self.id
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }

        fn get_value(&self, _field: &str) -> Option<Value> {
            None
        }

        fn set_value(&mut self, field: &str, _value: Value) -> Result<(), CodecError> {
            Err(CodecError::unknown_field(field))
        }
    }

    #[derive(Debug, Default)]
    struct Misnamed;

    impl Record for Misnamed {
        const TYPE_NAME: &'static str = "Misnamed";

        fn describe() -> RecordDef {
            RecordDef::new("Other")
                .identity("Id")
                .field(FieldDef::text("Attr"))
        }

        fn id(&self) -> &str {
            ""
        }

        fn set_id(&mut self, _id: String) {}

        fn get_value(&self, _field: &str) -> Option<Value> {
            None
        }

        fn set_value(&mut self, field: &str, _value: Value) -> Result<(), CodecError> {
            Err(CodecError::unknown_field(field))
        }
    }

    #[test]
    fn registering_twice_reuses_the_spec() {
        let mut registry = Registry::new();
        let first = registry.register::<Person>().unwrap();
        let second = registry.register::<Person>().unwrap();

        assert!(Arc::ptr_eq(first.spec(), second.spec()));
        assert_eq!(registry.type_names().collect::<Vec<_>>(), ["Person"]);
        assert_eq!(first.record_key("1"), "Person:1");
        assert_eq!(first.all_key(), "Person:all");
    }

    #[test]
    fn names_are_unique_across_types() {
        let mut registry = Registry::new();
        registry.register::<Person>().unwrap();

        let err = registry.register::<Impostor>().unwrap_err();
        assert!(matches!(
            err,
            Error::Registry(RegistryError::NameTaken { .. })
        ));
        assert_eq!(err.class(), ErrorClass::Compile);
    }

    #[test]
    fn describe_must_agree_with_type_name() {
        let mut registry = Registry::new();

        assert!(matches!(
            registry.register::<Misnamed>(),
            Err(Error::Registry(RegistryError::TypeNameMismatch { .. }))
        ));
        assert!(!registry.contains("Misnamed"));
        assert!(!registry.contains("Other"));
    }

    #[test]
    fn unregistered_types_are_reported() {
        let registry = Registry::new();

        assert_eq!(
            registry.spec_for::<BasicModel>().unwrap_err(),
            RegistryError::Unregistered {
                type_name: "BasicModel".to_string()
            }
        );
        assert!(registry.spec("Person").is_err());
    }
}
