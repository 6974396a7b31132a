//! Record definition compiler.
//!
//! Turns a declarative [`RecordDef`] into an immutable [`ModelSpec`]. Every
//! declaration problem is an error: a malformed tag never degrades into a
//! silently ignored option.

use crate::{
    KEY_SEPARATOR,
    db::key::{ALL_SUFFIX, SEQUENCE_SUFFIX},
    model::{
        def::{FieldDef, FieldShape, RecordDef},
        field::{Cardinality, FieldKind, FieldSpec, RelationSpec},
        spec::ModelSpec,
    },
    value::ScalarKind,
};
use std::collections::BTreeSet;
use thiserror::Error as ThisError;

/// Storage tag that excludes a field from persistence.
const IGNORE_TAG: &str = "-";

/// The single recognised entry of a field's option tag.
const INDEX_OPTION: &str = "index";

///
/// CompileError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum CompileError {
    #[error("invalid type name '{0}'")]
    InvalidTypeName(String),

    #[error("type '{type_name}' does not declare an identity attribute")]
    MissingIdentity { type_name: String },

    #[error("type '{type_name}': identity field '{field}' cannot carry tags")]
    TaggedIdentity { type_name: String, field: String },

    #[error("type '{type_name}', field '{field}': unrecognized option '{option}' in tag '{tag}'")]
    InvalidTag {
        type_name: String,
        field: String,
        tag: String,
        option: String,
    },

    #[error("type '{type_name}', field '{field}': invalid storage name '{storage_name}'")]
    InvalidStorageName {
        type_name: String,
        field: String,
        storage_name: String,
    },

    #[error("type '{type_name}': field '{field}' declared twice")]
    DuplicateField { type_name: String, field: String },

    #[error("type '{type_name}': storage name '{storage_name}' used by more than one field")]
    DuplicateStorageName {
        type_name: String,
        storage_name: String,
    },

    #[error("type '{type_name}': relation alias '{alias}' used by more than one field")]
    DuplicateAlias { type_name: String, alias: String },

    #[error(
        "type '{type_name}', field '{field}': relational fields must be named '...Id' or '...Ids'"
    )]
    RelationName { type_name: String, field: String },

    #[error("type '{type_name}', field '{field}': relation field has the wrong shape")]
    RelationShape { type_name: String, field: String },

    #[error("type '{type_name}', field '{field}': relational fields cannot be indexed")]
    IndexedRelation { type_name: String, field: String },

    #[error("type '{type_name}', field '{field}': alias declared without a relation target")]
    AliasWithoutTarget { type_name: String, field: String },

    #[error("type '{type_name}', field '{field}': id lists are only valid on relations")]
    ListWithoutRelation { type_name: String, field: String },
}

/// Compile a record definition into its runtime spec.
pub fn compile(def: &RecordDef) -> Result<ModelSpec, CompileError> {
    let type_name = def.type_name;
    if type_name.is_empty() || type_name.contains(KEY_SEPARATOR) {
        return Err(CompileError::InvalidTypeName(type_name.to_string()));
    }

    let identity = def
        .identity
        .filter(|name| !name.is_empty())
        .ok_or_else(|| CompileError::MissingIdentity {
            type_name: type_name.to_string(),
        })?;

    let mut fields = Vec::with_capacity(def.fields.len());
    let mut struct_names = BTreeSet::new();
    let mut storage_names = BTreeSet::new();
    let mut aliases = BTreeSet::new();

    for field in &def.fields {
        if field.name == identity {
            if has_tags(field) {
                return Err(CompileError::TaggedIdentity {
                    type_name: type_name.to_string(),
                    field: field.name.to_string(),
                });
            }
            continue;
        }

        if !struct_names.insert(field.name) {
            return Err(CompileError::DuplicateField {
                type_name: type_name.to_string(),
                field: field.name.to_string(),
            });
        }

        if field.storage == Some(IGNORE_TAG) {
            continue;
        }

        let spec = compile_field(type_name, field)?;

        if !storage_names.insert(spec.storage_name.clone()) {
            return Err(CompileError::DuplicateStorageName {
                type_name: type_name.to_string(),
                storage_name: spec.storage_name,
            });
        }
        if let Some(relation) = spec.relation()
            && !aliases.insert(relation.alias.clone())
        {
            return Err(CompileError::DuplicateAlias {
                type_name: type_name.to_string(),
                alias: relation.alias.clone(),
            });
        }

        fields.push(spec);
    }

    tracing::debug!(
        type_name,
        fields = fields.len(),
        indexed = fields.iter().filter(|f| f.indexed).count(),
        "compiled record spec"
    );

    Ok(ModelSpec {
        type_name: type_name.to_string(),
        fields,
    })
}

// Compile one non-ignored, non-identity field.
fn compile_field(type_name: &str, field: &FieldDef) -> Result<FieldSpec, CompileError> {
    let err_field = || field.name.to_string();

    let indexed = parse_options(type_name, field)?;
    let storage_name = match field.storage {
        Some(name) if !name.is_empty() => name,
        _ => field.name,
    };
    // Indexed fields own `<type>:<storage>` keys, which must not shadow the
    // membership set or the id counter.
    let reserved = indexed && (storage_name == ALL_SUFFIX || storage_name == SEQUENCE_SUFFIX);
    if storage_name.contains(KEY_SEPARATOR) || reserved {
        return Err(CompileError::InvalidStorageName {
            type_name: type_name.to_string(),
            field: err_field(),
            storage_name: storage_name.to_string(),
        });
    }

    let target = field.refers_to.filter(|target| !target.is_empty());
    let kind = match target {
        Some(target) => {
            if indexed {
                return Err(CompileError::IndexedRelation {
                    type_name: type_name.to_string(),
                    field: err_field(),
                });
            }
            FieldKind::Relational(compile_relation(type_name, field, target)?)
        }
        None => {
            if field.alias.is_some() {
                return Err(CompileError::AliasWithoutTarget {
                    type_name: type_name.to_string(),
                    field: err_field(),
                });
            }
            match field.shape {
                FieldShape::Scalar(kind) => FieldKind::Primitive(kind),
                FieldShape::Optional(kind) => FieldKind::PrimitivePointer(kind),
                FieldShape::IdList => {
                    return Err(CompileError::ListWithoutRelation {
                        type_name: type_name.to_string(),
                        field: err_field(),
                    });
                }
            }
        }
    };

    Ok(FieldSpec {
        struct_name: field.name.to_string(),
        storage_name: storage_name.to_string(),
        kind,
        indexed,
    })
}

// Validate naming and shape of a relational field.
fn compile_relation(
    type_name: &str,
    field: &FieldDef,
    target: &str,
) -> Result<RelationSpec, CompileError> {
    let cardinality = if field.name.ends_with("Ids") {
        Cardinality::Many
    } else if field.name.ends_with("Id") {
        Cardinality::One
    } else {
        return Err(CompileError::RelationName {
            type_name: type_name.to_string(),
            field: field.name.to_string(),
        });
    };

    let nullable = match (cardinality, field.shape) {
        (Cardinality::One, FieldShape::Scalar(ScalarKind::Text)) => false,
        (Cardinality::One, FieldShape::Optional(ScalarKind::Text)) => true,
        (Cardinality::Many, FieldShape::IdList) => false,
        _ => {
            return Err(CompileError::RelationShape {
                type_name: type_name.to_string(),
                field: field.name.to_string(),
            });
        }
    };

    let alias = field
        .alias
        .filter(|alias| !alias.is_empty())
        .unwrap_or(target);

    Ok(RelationSpec {
        target: target.to_string(),
        alias: alias.to_string(),
        cardinality,
        nullable,
    })
}

// Parse the option tag; returns whether the field is indexed.
fn parse_options(type_name: &str, field: &FieldDef) -> Result<bool, CompileError> {
    let Some(tag) = field.options else {
        return Ok(false);
    };
    if tag.is_empty() {
        return Ok(false);
    }

    let mut indexed = false;
    for option in tag.split(',').map(str::trim) {
        if option == INDEX_OPTION {
            indexed = true;
        } else {
            return Err(CompileError::InvalidTag {
                type_name: type_name.to_string(),
                field: field.name.to_string(),
                tag: tag.to_string(),
                option: option.to_string(),
            });
        }
    }

    Ok(indexed)
}

const fn has_tags(field: &FieldDef) -> bool {
    field.storage.is_some()
        || field.options.is_some()
        || field.refers_to.is_some()
        || field.alias.is_some()
}
