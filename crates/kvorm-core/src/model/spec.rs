use crate::model::field::FieldSpec;
use serde::Serialize;

///
/// ModelSpec
///
/// Compiled, read-only metadata for one record type. Built once at
/// registration and shared behind an `Arc` by every operation on the type.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ModelSpec {
    /// Namespace prefix for every storage key of this type.
    pub type_name: String,
    /// Persistable fields in declaration order; identity excluded.
    pub fields: Vec<FieldSpec>,
}

impl ModelSpec {
    #[must_use]
    pub fn field(&self, struct_name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.struct_name == struct_name)
    }

    #[must_use]
    pub fn field_by_storage(&self, storage_name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.storage_name == storage_name)
    }

    pub fn indexed_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.indexed)
    }

    pub fn relational_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.is_relational())
    }

    /// First relational field declared under `alias`.
    #[must_use]
    pub fn relation_field(&self, alias: &str) -> Option<&FieldSpec> {
        self.relational_fields()
            .find(|f| f.relation().is_some_and(|r| r.alias == alias))
    }
}
