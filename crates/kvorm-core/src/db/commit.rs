//! Commit preparation and execution.
//!
//! Contract: all fallible planning (encoding, index derivation) happens in
//! `prepare_*`. The resulting batch is handed to the executor in one
//! `execute` call, which applies all of it or none of it.

use crate::{
    db::{
        index::{IndexOp, index_mutations_for_delete, index_mutations_for_save},
        key::{all_key, record_key},
        state::RecordState,
        store::{Command, CommandExecutor, StoreError},
    },
    error::Error,
    model::ModelSpec,
    value::{CodecError, encode},
};

///
/// CommitBatch
///
/// Ordered commands for one record mutation, plus index accounting.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommitBatch {
    pub commands: Vec<Command>,
    pub index_inserts: u64,
    pub index_removes: u64,
}

impl CommitBatch {
    fn push_index_ops(&mut self, ops: Vec<IndexOp>) {
        for op in ops {
            if op.is_insert() {
                self.index_inserts += 1;
            } else {
                self.index_removes += 1;
            }
            self.commands.push(op.into());
        }
    }
}

/// Plan the batch persisting `new` over its prior stored state.
///
/// Order: field writes, field deletions, index ops (removals first), then
/// the `<type>:all` membership.
pub fn prepare_save(
    spec: &ModelSpec,
    old: Option<&RecordState>,
    new: &RecordState,
) -> Result<CommitBatch, Error> {
    let mut batch = CommitBatch::default();
    let key = record_key(&spec.type_name, &new.id);

    // Phase 1: split fields into present and now-null.
    let mut present = Vec::new();
    let mut cleared = Vec::new();
    for field in &spec.fields {
        let value = new
            .get(&field.struct_name)
            .ok_or_else(|| CodecError::unknown_field(&field.struct_name))?;
        match encode(value)? {
            Some(encoded) => present.push((field.storage_name.clone(), encoded)),
            None => cleared.push(field.storage_name.clone()),
        }
    }

    if !present.is_empty() {
        batch.commands.push(Command::HashSet {
            key: key.clone(),
            fields: present,
        });
    }
    if !cleared.is_empty() && old.is_some() {
        batch.commands.push(Command::HashDelete {
            key,
            fields: cleared,
        });
    }

    // Phase 2: index maintenance.
    batch.push_index_ops(index_mutations_for_save(spec, old, new)?);

    // Phase 3: membership.
    batch.commands.push(Command::SetAdd {
        key: all_key(&spec.type_name),
        member: new.id.clone(),
    });

    Ok(batch)
}

/// Plan the batch removing a stored record and every trace of it.
pub fn prepare_delete(spec: &ModelSpec, state: &RecordState) -> Result<CommitBatch, Error> {
    let mut batch = CommitBatch::default();

    batch.commands.push(Command::Delete {
        key: record_key(&spec.type_name, &state.id),
    });
    batch.push_index_ops(index_mutations_for_delete(spec, state)?);
    batch.commands.push(Command::SetRemove {
        key: all_key(&spec.type_name),
        member: state.id.clone(),
    });

    Ok(batch)
}

/// Execute a prepared batch. A failure is returned unchanged, never retried.
pub fn commit<X: CommandExecutor>(
    executor: &X,
    type_name: &str,
    batch: &CommitBatch,
) -> Result<(), StoreError> {
    tracing::debug!(
        type_name,
        commands = batch.commands.len(),
        index_inserts = batch.index_inserts,
        index_removes = batch.index_removes,
        "committing batch"
    );

    executor.execute(&batch.commands).inspect_err(|err| {
        tracing::warn!(type_name, error = %err, "batch rejected by the store");
    })
}

///
/// TESTS
///
