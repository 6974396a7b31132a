use crate::value::{CodecError, ScalarKind, Value, decode, decode_list};
use serde::Serialize;

///
/// FieldSpec
/// Compiled metadata for one persistable field.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FieldSpec {
    /// Field name as declared on the record.
    pub struct_name: String,
    /// Hash field name in the store.
    pub storage_name: String,
    pub kind: FieldKind,
    /// Whether exact-match (and, for numbers, range) indexes are maintained.
    pub indexed: bool,
}

impl FieldSpec {
    #[must_use]
    pub const fn relation(&self) -> Option<&RelationSpec> {
        match &self.kind {
            FieldKind::Relational(relation) => Some(relation),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_relational(&self) -> bool {
        matches!(self.kind, FieldKind::Relational(_))
    }

    /// Scalar kind of a primitive or pointer field.
    #[must_use]
    pub const fn scalar_kind(&self) -> Option<ScalarKind> {
        match self.kind {
            FieldKind::Primitive(kind) | FieldKind::PrimitivePointer(kind) => Some(kind),
            FieldKind::Relational(_) => None,
        }
    }

    /// Value a record holds when the stored hash lacks this field.
    #[must_use]
    pub fn absent_value(&self) -> Value {
        match &self.kind {
            FieldKind::Primitive(kind) => match kind {
                ScalarKind::Bool => Value::Bool(false),
                ScalarKind::Int => Value::Int(0),
                ScalarKind::Uint => Value::Uint(0),
                ScalarKind::Float => Value::Float(0.0),
                ScalarKind::Text => Value::Text(String::new()),
            },
            FieldKind::PrimitivePointer(_) => Value::Null,
            FieldKind::Relational(relation) => match relation.cardinality {
                Cardinality::One if relation.nullable => Value::Null,
                Cardinality::One => Value::Text(String::new()),
                Cardinality::Many => Value::List(Vec::new()),
            },
        }
    }

    /// Decode this field's stored string.
    pub fn decode(&self, raw: &str) -> Result<Value, CodecError> {
        match &self.kind {
            FieldKind::Primitive(kind) | FieldKind::PrimitivePointer(kind) => decode(*kind, raw),
            FieldKind::Relational(relation) => match relation.cardinality {
                Cardinality::One => decode(ScalarKind::Text, raw),
                Cardinality::Many => decode_list(raw),
            },
        }
    }

    /// Whether `value` is something this field can hold.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match &self.kind {
            FieldKind::Primitive(kind) => value.scalar_kind() == Some(*kind),
            FieldKind::PrimitivePointer(kind) => {
                value.is_null() || value.scalar_kind() == Some(*kind)
            }
            FieldKind::Relational(relation) => match relation.cardinality {
                Cardinality::One => {
                    matches!(value, Value::Text(_)) || (relation.nullable && value.is_null())
                }
                Cardinality::Many => matches!(value, Value::List(_)),
            },
        }
    }
}

///
/// FieldKind
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum FieldKind {
    Primitive(ScalarKind),
    PrimitivePointer(ScalarKind),
    Relational(RelationSpec),
}

///
/// RelationSpec
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RelationSpec {
    /// Registered type name the field points at.
    pub target: String,
    /// Externally visible relation name; defaults to `target`.
    pub alias: String,
    pub cardinality: Cardinality,
    /// Single references declared as pointers may be null instead of empty.
    pub nullable: bool,
}

///
/// Cardinality
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Cardinality {
    /// `...Id`: one referenced record.
    One,
    /// `...Ids`: a list of referenced records.
    Many,
}
