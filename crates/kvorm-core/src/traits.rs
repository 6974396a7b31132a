use crate::{
    model::RecordDef,
    value::{CodecError, Value},
};

///
/// Record
///
/// A persistable record type. Implementations expose their fields by declared
/// name; the engine never inspects the concrete struct.
///
/// `describe` is called once, at registration. `get_value` must return a
/// value for every non-ignored field in the definition, with `Value::Null`
/// for an unset pointer field.
///

pub trait Record: Default + 'static {
    /// Namespace of every storage key of this type.
    const TYPE_NAME: &'static str;

    fn describe() -> RecordDef;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    fn get_value(&self, field: &str) -> Option<Value>;

    fn set_value(&mut self, field: &str, value: Value) -> Result<(), CodecError>;
}
