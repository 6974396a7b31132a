use crate::{
    model::*,
    test_fixtures::{IndexedPointers, IndexedPrimitives, Person},
    traits::Record,
    value::{ScalarKind, Value},
};

fn person_def() -> RecordDef {
    RecordDef::new("Person")
        .identity("Id")
        .field(FieldDef::text("Name").indexed())
        .field(FieldDef::text("AgeId").refers_to("Person"))
}

fn compile_err(def: &RecordDef) -> CompileError {
    compile(def).expect_err("definition should be rejected")
}

#[test]
fn compiling_twice_yields_identical_specs() {
    let first = compile(&person_def()).unwrap();
    let second = compile(&person_def()).unwrap();

    assert_eq!(first, second);
    assert_eq!(compile(&Person::describe()).unwrap(), first);
}

#[test]
fn identity_field_is_not_a_field_spec() {
    let def = person_def().field(FieldDef::text("Id"));
    let spec = compile(&def).unwrap();

    assert!(spec.field("Id").is_none());
    assert_eq!(spec.fields.len(), 2);
}

#[test]
fn identity_is_required() {
    let def = RecordDef::new("Nameless").field(FieldDef::text("Attr"));

    assert_eq!(
        compile_err(&def),
        CompileError::MissingIdentity {
            type_name: "Nameless".to_string()
        }
    );
}

#[test]
fn tagged_identity_is_rejected() {
    let def = person_def().field(FieldDef::text("Id").indexed());

    assert!(matches!(
        compile_err(&def),
        CompileError::TaggedIdentity { .. }
    ));
}

#[test]
fn ignored_fields_are_skipped() {
    let def = RecordDef::new("Ignored")
        .identity("Id")
        .field(FieldDef::text("Attr").ignore())
        .field(FieldDef::text("Kept"));
    let spec = compile(&def).unwrap();

    assert!(spec.field("Attr").is_none());
    assert!(spec.field("Kept").is_some());
}

#[test]
fn rename_changes_storage_name_only() {
    let def = RecordDef::new("Custom")
        .identity("Id")
        .field(FieldDef::text("Attr").rename("a"));
    let spec = compile(&def).unwrap();
    let field = spec.field("Attr").unwrap();

    assert_eq!(field.storage_name, "a");
    assert_eq!(spec.field_by_storage("a"), Some(field));
    assert!(spec.field_by_storage("Attr").is_none());
}

#[test]
fn index_and_rename_combine() {
    let def = RecordDef::new("CustomIndex")
        .identity("Id")
        .field(
            FieldDef::scalar("Int", ScalarKind::Int)
                .indexed()
                .rename("integer"),
        )
        .field(FieldDef::text("String").options("index").rename("str"));
    let spec = compile(&def).unwrap();

    let names: Vec<_> = spec
        .indexed_fields()
        .map(|f| f.storage_name.as_str())
        .collect();
    assert_eq!(names, ["integer", "str"]);
}

#[test]
fn unrecognized_option_fails_closed() {
    let def = RecordDef::new("Invalid")
        .identity("Id")
        .field(FieldDef::text("Attr").options("index,sparse"));

    assert_eq!(
        compile_err(&def),
        CompileError::InvalidTag {
            type_name: "Invalid".to_string(),
            field: "Attr".to_string(),
            tag: "index,sparse".to_string(),
            option: "sparse".to_string(),
        }
    );
}

#[test]
fn empty_option_segment_is_invalid() {
    let def = RecordDef::new("Invalid")
        .identity("Id")
        .field(FieldDef::text("Attr").options("index,"));

    assert!(matches!(compile_err(&def), CompileError::InvalidTag { .. }));
}

#[test]
fn relation_alias_defaults_to_target() {
    let spec = compile(&person_def()).unwrap();
    let relation = spec.field("AgeId").unwrap().relation().unwrap();

    assert_eq!(relation.target, "Person");
    assert_eq!(relation.alias, "Person");
    assert_eq!(relation.cardinality, Cardinality::One);
    assert!(!relation.nullable);
    assert!(!spec.field("AgeId").unwrap().indexed);
}

#[test]
fn relation_requires_id_suffix() {
    let def = RecordDef::new("Bad")
        .identity("Id")
        .field(FieldDef::text("Owner").refers_to("Person"));

    assert!(matches!(compile_err(&def), CompileError::RelationName { .. }));
}

#[test]
fn id_suffix_without_target_is_primitive() {
    let def = RecordDef::new("Plain")
        .identity("Id")
        .field(FieldDef::text("ExternalId").indexed());
    let spec = compile(&def).unwrap();
    let field = spec.field("ExternalId").unwrap();

    assert_eq!(field.kind, FieldKind::Primitive(ScalarKind::Text));
    assert!(field.indexed);
}

#[test]
fn has_many_relations_need_id_lists() {
    let ok = RecordDef::new("Team")
        .identity("Id")
        .field(FieldDef::id_list("MemberIds").refers_to("Person").alias("Members"));
    let relation = compile(&ok).unwrap().relation_field("Members").cloned().unwrap();
    assert_eq!(relation.relation().unwrap().cardinality, Cardinality::Many);

    let bad = RecordDef::new("Team")
        .identity("Id")
        .field(FieldDef::text("MemberIds").refers_to("Person"));
    assert!(matches!(compile_err(&bad), CompileError::RelationShape { .. }));
}

#[test]
fn indexed_relation_is_rejected() {
    let def = RecordDef::new("Bad")
        .identity("Id")
        .field(FieldDef::text("OwnerId").refers_to("Person").indexed());

    assert!(matches!(
        compile_err(&def),
        CompileError::IndexedRelation { .. }
    ));
}

#[test]
fn duplicate_aliases_are_rejected() {
    let def = RecordDef::new("Pair")
        .identity("Id")
        .field(FieldDef::text("LeftId").refers_to("Person").alias("Other"))
        .field(FieldDef::text("RightId").refers_to("Person").alias("Other"));

    assert!(matches!(compile_err(&def), CompileError::DuplicateAlias { .. }));
}

#[test]
fn duplicate_storage_names_are_rejected() {
    let def = RecordDef::new("Clash")
        .identity("Id")
        .field(FieldDef::text("A").rename("x"))
        .field(FieldDef::text("B").rename("x"));

    assert!(matches!(
        compile_err(&def),
        CompileError::DuplicateStorageName { .. }
    ));
}

#[test]
fn separators_are_rejected_in_names() {
    let type_def = RecordDef::new("a:b").identity("Id");
    assert!(matches!(
        compile_err(&type_def),
        CompileError::InvalidTypeName(_)
    ));

    let field_def = RecordDef::new("Ok")
        .identity("Id")
        .field(FieldDef::text("Attr").rename("x:y"));
    assert!(matches!(
        compile_err(&field_def),
        CompileError::InvalidStorageName { .. }
    ));

    for reserved in ["all", "next_id"] {
        let indexed_def = RecordDef::new("Ok")
            .identity("Id")
            .field(
                FieldDef::scalar("Count", ScalarKind::Int)
                    .rename(reserved)
                    .indexed(),
            );
        assert!(matches!(
            compile_err(&indexed_def),
            CompileError::InvalidStorageName { .. }
        ));

        // Unindexed fields own no keys of their own.
        let plain_def = RecordDef::new("Ok")
            .identity("Id")
            .field(FieldDef::scalar("Count", ScalarKind::Int).rename(reserved));
        assert!(compile(&plain_def).is_ok());
    }
}

#[test]
fn alias_without_target_is_rejected() {
    let def = RecordDef::new("Bad")
        .identity("Id")
        .field(FieldDef::text("OwnerId").alias("Owner"));

    assert!(matches!(
        compile_err(&def),
        CompileError::AliasWithoutTarget { .. }
    ));
}

#[test]
fn pointer_fields_compile_as_pointers() {
    let spec = compile(&IndexedPointers::describe()).unwrap();

    for field in &spec.fields {
        assert!(matches!(field.kind, FieldKind::PrimitivePointer(_)));
        assert!(field.indexed);
        assert_eq!(field.absent_value(), Value::Null);
    }
}

#[test]
fn absent_primitive_values_are_zero() {
    let spec = compile(&IndexedPrimitives::describe()).unwrap();

    assert_eq!(spec.field("Int").unwrap().absent_value(), Value::Int(0));
    assert_eq!(
        spec.field("String").unwrap().absent_value(),
        Value::Text(String::new())
    );
    assert_eq!(spec.field("Bool").unwrap().absent_value(), Value::Bool(false));
}
