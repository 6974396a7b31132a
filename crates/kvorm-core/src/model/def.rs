use crate::value::ScalarKind;

///
/// RecordDef
///
/// Declarative description of a record type, written once per type in
/// `Record::describe` and handed to the compiler at registration.
///

#[derive(Clone, Debug)]
pub struct RecordDef {
    pub type_name: &'static str,
    pub identity: Option<&'static str>,
    pub fields: Vec<FieldDef>,
}

impl RecordDef {
    #[must_use]
    pub const fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            identity: None,
            fields: Vec::new(),
        }
    }

    /// Declare the identity attribute. Required; registration fails without it.
    #[must_use]
    pub const fn identity(mut self, name: &'static str) -> Self {
        self.identity = Some(name);
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }
}

///
/// FieldShape
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldShape {
    /// A plain primitive, always present.
    Scalar(ScalarKind),

    /// A pointer to a primitive; unset means absent.
    Optional(ScalarKind),

    /// A list of record ids, only valid on has-many relation fields.
    IdList,
}

///
/// FieldDef
///
/// One declared field plus its raw tags. Tags are kept as strings so the
/// compiler can reject anything it does not recognise.
///

#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub shape: FieldShape,

    /// `"-"` ignores the field, any other non-empty value renames it in storage.
    pub storage: Option<&'static str>,

    /// Comma separated options; `index` is the only one understood.
    pub options: Option<&'static str>,

    pub refers_to: Option<&'static str>,
    pub alias: Option<&'static str>,
}

impl FieldDef {
    #[must_use]
    pub const fn new(name: &'static str, shape: FieldShape) -> Self {
        Self {
            name,
            shape,
            storage: None,
            options: None,
            refers_to: None,
            alias: None,
        }
    }

    #[must_use]
    pub const fn scalar(name: &'static str, kind: ScalarKind) -> Self {
        Self::new(name, FieldShape::Scalar(kind))
    }

    #[must_use]
    pub const fn optional(name: &'static str, kind: ScalarKind) -> Self {
        Self::new(name, FieldShape::Optional(kind))
    }

    #[must_use]
    pub const fn text(name: &'static str) -> Self {
        Self::scalar(name, ScalarKind::Text)
    }

    #[must_use]
    pub const fn id_list(name: &'static str) -> Self {
        Self::new(name, FieldShape::IdList)
    }

    #[must_use]
    pub const fn storage(mut self, tag: &'static str) -> Self {
        self.storage = Some(tag);
        self
    }

    #[must_use]
    pub const fn ignore(self) -> Self {
        self.storage("-")
    }

    #[must_use]
    pub const fn rename(self, storage_name: &'static str) -> Self {
        self.storage(storage_name)
    }

    #[must_use]
    pub const fn options(mut self, tag: &'static str) -> Self {
        self.options = Some(tag);
        self
    }

    #[must_use]
    pub const fn indexed(self) -> Self {
        self.options("index")
    }

    #[must_use]
    pub const fn refers_to(mut self, target: &'static str) -> Self {
        self.refers_to = Some(target);
        self
    }

    #[must_use]
    pub const fn alias(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }
}
