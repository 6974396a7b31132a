use crate::{
    model::{FieldDef, RecordDef},
    traits::Record,
    value::{CodecError, FieldValue, ScalarKind, Value},
};

///
/// test_record
///
/// Test-only helper that writes the by-name field plumbing of a `Record`
/// impl. Each field maps a declared name onto a struct member.
///

macro_rules! test_record {
    (
        $ty:ident, $type_name:literal, $describe:expr,
        { $( $name:literal => $member:ident ),* $(,)? }
    ) => {
        impl Record for $ty {
            const TYPE_NAME: &'static str = $type_name;

            fn describe() -> RecordDef {
                $describe
            }

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn get_value(&self, field: &str) -> Option<Value> {
                match field {
                    $( $name => Some(self.$member.to_value()), )*
                    _ => None,
                }
            }

            fn set_value(&mut self, field: &str, value: Value) -> Result<(), CodecError> {
                match field {
                    $(
                        $name => {
                            self.$member = FieldValue::from_value(&value)
                                .ok_or_else(|| CodecError::mismatch(field, value))?;
                        }
                    )*
                    _ => return Err(CodecError::unknown_field(field)),
                }

                Ok(())
            }
        }
    };
}

///
/// Person
/// Self-referencing record with one indexed text field.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Person {
    pub id: String,
    pub name: String,
    pub age_id: String,
}

test_record!(
    Person,
    "Person",
    RecordDef::new("Person")
        .identity("Id")
        .field(FieldDef::text("Name").indexed())
        .field(FieldDef::text("AgeId").refers_to("Person")),
    { "Name" => name, "AgeId" => age_id }
);

///
/// BasicModel
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicModel {
    pub id: String,
    pub attr: String,
}

test_record!(
    BasicModel,
    "BasicModel",
    RecordDef::new("BasicModel")
        .identity("Id")
        .field(FieldDef::text("Attr")),
    { "Attr" => attr }
);

///
/// IndexedPrimitives
/// Every scalar kind, indexed.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexedPrimitives {
    pub id: String,
    pub int: i64,
    pub uint: u64,
    pub float: f64,
    pub string: String,
    pub boolean: bool,
}

test_record!(
    IndexedPrimitives,
    "IndexedPrimitives",
    RecordDef::new("IndexedPrimitives")
        .identity("Id")
        .field(FieldDef::scalar("Int", ScalarKind::Int).indexed())
        .field(FieldDef::scalar("Uint", ScalarKind::Uint).indexed())
        .field(FieldDef::scalar("Float", ScalarKind::Float).indexed())
        .field(FieldDef::text("String").indexed())
        .field(FieldDef::scalar("Bool", ScalarKind::Bool).indexed()),
    {
        "Int" => int,
        "Uint" => uint,
        "Float" => float,
        "String" => string,
        "Bool" => boolean,
    }
);

///
/// IndexedPointers
/// Every scalar kind behind a pointer, indexed.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexedPointers {
    pub id: String,
    pub int: Option<i64>,
    pub uint: Option<u64>,
    pub float: Option<f64>,
    pub string: Option<String>,
    pub boolean: Option<bool>,
}

test_record!(
    IndexedPointers,
    "IndexedPointers",
    RecordDef::new("IndexedPointers")
        .identity("Id")
        .field(FieldDef::optional("Int", ScalarKind::Int).indexed())
        .field(FieldDef::optional("Uint", ScalarKind::Uint).indexed())
        .field(FieldDef::optional("Float", ScalarKind::Float).indexed())
        .field(FieldDef::optional("String", ScalarKind::Text).indexed())
        .field(FieldDef::optional("Bool", ScalarKind::Bool).indexed()),
    {
        "Int" => int,
        "Uint" => uint,
        "Float" => float,
        "String" => string,
        "Bool" => boolean,
    }
);

///
/// Pet
/// Optional, aliased reference to a `Person`.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pet {
    pub id: String,
    pub name: String,
    pub owner_id: Option<String>,
}

test_record!(
    Pet,
    "Pet",
    RecordDef::new("Pet")
        .identity("Id")
        .field(FieldDef::text("Name"))
        .field(
            FieldDef::optional("OwnerId", ScalarKind::Text)
                .refers_to("Person")
                .alias("Owner")
        ),
    { "Name" => name, "OwnerId" => owner_id }
);

///
/// Team
/// Has-many reference to `Person`.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub member_ids: Vec<String>,
}

test_record!(
    Team,
    "Team",
    RecordDef::new("Team")
        .identity("Id")
        .field(FieldDef::text("Name"))
        .field(
            FieldDef::id_list("MemberIds")
                .refers_to("Person")
                .alias("Members")
        ),
    { "Name" => name, "MemberIds" => member_ids }
);
