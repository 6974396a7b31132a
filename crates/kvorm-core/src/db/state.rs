use crate::{
    db::{
        key::{all_key, record_key},
        store::{CommandExecutor, StoreError},
    },
    error::Error,
    model::ModelSpec,
    traits::Record,
    value::{CodecError, Value},
};
use serde::Serialize;
use std::collections::BTreeMap;

///
/// RecordState
///
/// Untyped snapshot of one record: its id plus a value for every field in the
/// spec, keyed by struct name. Index diffs, commits and name-based lookups
/// all run on this form.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecordState {
    pub type_name: String,
    pub id: String,
    pub values: BTreeMap<String, Value>,
}

impl RecordState {
    /// Snapshot a typed record, checking every value against its field kind.
    pub fn capture<R: Record>(spec: &ModelSpec, record: &R) -> Result<Self, CodecError> {
        let mut values = BTreeMap::new();

        for field in &spec.fields {
            let value = record
                .get_value(&field.struct_name)
                .ok_or_else(|| CodecError::unknown_field(&field.struct_name))?;
            if !field.accepts(&value) {
                return Err(CodecError::mismatch(&field.struct_name, value));
            }
            values.insert(field.struct_name.clone(), value);
        }

        Ok(Self {
            type_name: spec.type_name.clone(),
            id: record.id().to_string(),
            values,
        })
    }

    /// Decode a stored hash. Fields missing from the hash take their absent
    /// value; hash entries with no matching field are ignored.
    pub fn from_hash(
        spec: &ModelSpec,
        id: &str,
        hash: &BTreeMap<String, String>,
    ) -> Result<Self, CodecError> {
        let mut values = BTreeMap::new();

        for field in &spec.fields {
            let value = match hash.get(&field.storage_name) {
                Some(raw) => field.decode(raw)?,
                None => field.absent_value(),
            };
            values.insert(field.struct_name.clone(), value);
        }

        Ok(Self {
            type_name: spec.type_name.clone(),
            id: id.to_string(),
            values,
        })
    }

    /// Write id and values back onto a typed record.
    pub fn apply_to<R: Record>(&self, record: &mut R) -> Result<(), CodecError> {
        record.set_id(self.id.clone());
        for (field, value) in &self.values {
            record.set_value(field, value.clone())?;
        }

        Ok(())
    }

    /// Build a fresh typed record from this state.
    pub fn to_record<R: Record>(&self) -> Result<R, CodecError> {
        let mut record = R::default();
        self.apply_to(&mut record)?;

        Ok(record)
    }

    #[must_use]
    pub fn get(&self, struct_name: &str) -> Option<&Value> {
        self.values.get(struct_name)
    }
}

/// Read the stored state of one record, if it exists.
///
/// A record whose fields are all null has no hash, only its `<type>:all`
/// membership; it loads as an all-absent state.
pub fn load_state<X: CommandExecutor>(
    executor: &X,
    spec: &ModelSpec,
    id: &str,
) -> Result<Option<RecordState>, Error> {
    let hash = match executor.hash_get_all(&record_key(&spec.type_name, id))? {
        Some(hash) => hash,
        None if executor.set_contains(&all_key(&spec.type_name), id)? => BTreeMap::new(),
        None => return Ok(None),
    };

    Ok(Some(RecordState::from_hash(spec, id, &hash)?))
}

/// Whether a record of `type_name` with `id` is stored.
pub fn record_exists<X: CommandExecutor>(
    executor: &X,
    type_name: &str,
    id: &str,
) -> Result<bool, StoreError> {
    Ok(executor.exists(&record_key(type_name, id))?
        || executor.set_contains(&all_key(type_name), id)?)
}

///
/// TESTS
///
