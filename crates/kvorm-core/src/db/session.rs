use crate::{
    db::{
        commit::{CommitBatch, commit, prepare_delete, prepare_save},
        index::index_mutations_for_save,
        key::{all_key, sequence_key, validate_id},
        query::{range_lookup_key, value_lookup_key},
        registry::Registry,
        relation::{Relation, RelationError, resolve, unsupported_has_many, validate_relations},
        state::{RecordState, load_state, record_exists},
        store::{Command, CommandExecutor},
    },
    error::Error,
    model::ModelSpec,
    obs::sink::{ExecKind, MetricsEvent, MetricsSink, Span, with_metrics_sink},
    traits::Record,
    value::Value,
};
use kvorm_config::{IdStrategy, KvormConfig};
use std::{collections::BTreeSet, rc::Rc};
use ulid::Ulid;

///
/// Session
///
/// Entry point for every record operation. Borrows the registry and the
/// configuration, owns (or borrows) an executor, and keeps nothing else
/// between calls.
///

pub struct Session<'a, X> {
    registry: &'a Registry,
    config: &'a KvormConfig,
    executor: X,
    metrics: Option<Rc<dyn MetricsSink>>,
}

impl<'a, X: CommandExecutor> Session<'a, X> {
    #[must_use]
    pub const fn new(registry: &'a Registry, config: &'a KvormConfig, executor: X) -> Self {
        Self {
            registry,
            config,
            executor,
            metrics: None,
        }
    }

    /// Route this session's metrics events to `sink` instead of the global one.
    #[must_use]
    pub fn metrics_sink(mut self, sink: Rc<dyn MetricsSink>) -> Self {
        self.metrics = Some(sink);
        self
    }

    #[must_use]
    pub const fn executor(&self) -> &X {
        &self.executor
    }

    #[must_use]
    pub const fn registry(&self) -> &'a Registry {
        self.registry
    }

    // ---------------------------------------------------------------------
    // Save
    // ---------------------------------------------------------------------

    /// Persist one record, assigning an id first if it has none.
    ///
    /// Nothing is written unless every check passes; the id is set on the
    /// record only once its batch has committed.
    pub fn save<R: Record>(&self, record: &mut R) -> Result<(), Error> {
        self.with_metrics(|| {
            let spec = self.registry.spec_for::<R>()?;
            self.save_one(spec, record)
        })
    }

    /// Persist several records of one type.
    ///
    /// All records are validated before the first write; batches then commit
    /// in order and the first failing commit stops the run.
    pub fn save_all<R: Record>(&self, records: &mut [R]) -> Result<(), Error> {
        self.with_metrics(|| -> Result<(), Error> {
            let spec = self.registry.spec_for::<R>()?;

            for record in records.iter() {
                self.preflight(spec, record)?;
            }
            for record in records.iter_mut() {
                self.save_one(spec, record)?;
            }

            Ok(())
        })
    }

    fn save_one<R: Record>(&self, spec: &ModelSpec, record: &mut R) -> Result<(), Error> {
        let mut span = self.span(ExecKind::Save, &spec.type_name);

        // Phase 1: validate.
        let (mut state, lookups) = self.preflight(spec, record)?;
        span.event(MetricsEvent::RelationValidation {
            type_name: &spec.type_name,
            lookups,
        });

        // Phase 2: assign identity, or read the prior state of an update.
        let old = if state.id.is_empty() {
            state.id = self.next_id(spec)?;
            None
        } else {
            load_state(&self.executor, spec, &state.id)?
        };

        // Phase 3: plan and commit.
        let batch = prepare_save(spec, old.as_ref(), &state)?;
        commit(&self.executor, &spec.type_name, &batch)?;

        span.event(MetricsEvent::IndexDelta {
            type_name: &spec.type_name,
            inserts: batch.index_inserts,
            removes: batch.index_removes,
        });
        span.set_rows(1);
        record.set_id(state.id);

        Ok(())
    }

    // Every check that must pass before a save writes anything.
    fn preflight<R: Record>(
        &self,
        spec: &ModelSpec,
        record: &R,
    ) -> Result<(RecordState, u64), Error> {
        let state = RecordState::capture(spec, record)?;
        if !state.id.is_empty() {
            validate_id(spec, &state.id)?;
        }
        let lookups = validate_relations(self.registry, &self.executor, spec, &state)?;

        Ok((state, lookups))
    }

    // Draw until the id is usable and unoccupied; caller-supplied ids may
    // already hold upcoming counter values.
    fn next_id(&self, spec: &ModelSpec) -> Result<String, Error> {
        loop {
            let id = match self.config.ids.strategy {
                IdStrategy::Ulid => Ulid::new().to_string(),
                IdStrategy::Sequence => self
                    .executor
                    .incr(&sequence_key(&spec.type_name))?
                    .to_string(),
            };

            if validate_id(spec, &id).is_ok()
                && !record_exists(&self.executor, &spec.type_name, &id)?
            {
                return Ok(id);
            }

            tracing::debug!(
                type_name = %spec.type_name,
                id = %id,
                "generated id taken, drawing again"
            );
        }
    }

    // ---------------------------------------------------------------------
    // Load
    // ---------------------------------------------------------------------

    /// Load a record by id.
    pub fn find<R: Record>(&self, id: &str) -> Result<R, Error> {
        let mut record = R::default();
        self.scan_into(id, &mut record)?;

        Ok(record)
    }

    /// Load a record by id into an existing instance.
    pub fn scan_into<R: Record>(&self, id: &str, record: &mut R) -> Result<(), Error> {
        self.with_metrics(|| -> Result<(), Error> {
            let spec = self.registry.spec_for::<R>()?;
            let mut span = self.span(ExecKind::Load, &spec.type_name);

            self.load(spec, id)?.apply_to(record)?;
            span.set_rows(1);

            Ok(())
        })
    }

    /// Load a record by registered type name, without a concrete type.
    pub fn find_by_name(&self, type_name: &str, id: &str) -> Result<RecordState, Error> {
        self.with_metrics(|| -> Result<RecordState, Error> {
            let spec = self.registry.spec(type_name)?;
            let mut span = self.span(ExecKind::Load, &spec.type_name);

            let state = self.load(spec, id)?;
            span.set_rows(1);

            Ok(state)
        })
    }

    pub fn exists<R: Record>(&self, id: &str) -> Result<bool, Error> {
        let spec = self.registry.spec_for::<R>()?;
        if id.is_empty() || validate_id(spec, id).is_err() {
            return Ok(false);
        }

        Ok(record_exists(&self.executor, &spec.type_name, id)?)
    }

    /// Every stored id of `R`.
    pub fn all_ids<R: Record>(&self) -> Result<BTreeSet<String>, Error> {
        let spec = self.registry.spec_for::<R>()?;

        Ok(self.executor.set_members(&all_key(&spec.type_name))?)
    }

    pub fn count<R: Record>(&self) -> Result<usize, Error> {
        Ok(self.all_ids::<R>()?.len())
    }

    // Ids that cannot be valid storage ids can never be found.
    fn load(&self, spec: &ModelSpec, id: &str) -> Result<RecordState, Error> {
        let not_found = || Error::not_found(&spec.type_name, id);
        if id.is_empty() || validate_id(spec, id).is_err() {
            return Err(not_found());
        }

        load_state(&self.executor, spec, id)?.ok_or_else(not_found)
    }

    // ---------------------------------------------------------------------
    // Delete
    // ---------------------------------------------------------------------

    /// Delete a stored record. Deleting an absent record is `NotFound`.
    pub fn delete<R: Record>(&self, record: &R) -> Result<(), Error> {
        self.delete_by_ids::<R>(&[record.id()])
    }

    pub fn delete_all<R: Record>(&self, records: &[R]) -> Result<(), Error> {
        let ids: Vec<&str> = records.iter().map(Record::id).collect();

        self.delete_by_ids::<R>(&ids)
    }

    /// Delete records of `R` by id, in order, stopping at the first failure.
    pub fn delete_by_ids<R: Record>(&self, ids: &[&str]) -> Result<(), Error> {
        self.with_metrics(|| {
            let spec = self.registry.spec_for::<R>()?;
            self.delete_ids(spec, ids)
        })
    }

    /// Delete records of a registered type name by id.
    pub fn delete_by_name(&self, type_name: &str, ids: &[&str]) -> Result<(), Error> {
        self.with_metrics(|| {
            let spec = self.registry.spec(type_name)?;
            self.delete_ids(spec, ids)
        })
    }

    fn delete_ids(&self, spec: &ModelSpec, ids: &[&str]) -> Result<(), Error> {
        let mut span = self.span(ExecKind::Delete, &spec.type_name);
        let mut deleted = 0u64;

        for id in ids {
            let state = self.load(spec, id)?;
            let batch = prepare_delete(spec, &state)?;
            commit(&self.executor, &spec.type_name, &batch)?;

            span.event(MetricsEvent::IndexDelta {
                type_name: &spec.type_name,
                inserts: batch.index_inserts,
                removes: batch.index_removes,
            });
            deleted += 1;
            span.set_rows(deleted);
        }

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Relations
    // ---------------------------------------------------------------------

    /// Resolve a has-one relation of `record` by alias.
    pub fn resolve<R: Record>(&self, record: &R, alias: &str) -> Result<Option<Relation>, Error> {
        let spec = self.registry.spec_for::<R>()?;
        let state = RecordState::capture(spec, record)?;

        Ok(resolve(spec, &state, alias)?)
    }

    /// Load the record a has-one relation points at.
    ///
    /// `T` must be the relation's target type. A reference whose target has
    /// since been deleted surfaces as `NotFound`.
    pub fn fetch_related<R: Record, T: Record>(
        &self,
        record: &R,
        alias: &str,
    ) -> Result<Option<T>, Error> {
        let Some(relation) = self.resolve(record, alias)? else {
            return Ok(None);
        };
        if relation.target != T::TYPE_NAME {
            return Err(RelationError::TargetTypeMismatch {
                alias: alias.to_string(),
                target: relation.target,
                requested: T::TYPE_NAME.to_string(),
            }
            .into());
        }

        self.find::<T>(&relation.id).map(Some)
    }

    /// Has-many relations are declared and validated but not materialized;
    /// this always fails, with `NotImplemented` for a declared alias.
    pub fn fetch_all<R: Record, T: Record>(
        &self,
        _record: &R,
        alias: &str,
    ) -> Result<Vec<T>, Error> {
        let spec = self.registry.spec_for::<R>()?;

        Err(unsupported_has_many(spec, alias).into())
    }

    // ---------------------------------------------------------------------
    // Index queries
    // ---------------------------------------------------------------------

    /// Ids of `R` whose indexed `field` equals `value`.
    pub fn find_ids_by_value<R: Record>(
        &self,
        field: &str,
        value: &Value,
    ) -> Result<BTreeSet<String>, Error> {
        self.with_metrics(|| -> Result<BTreeSet<String>, Error> {
            let spec = self.registry.spec_for::<R>()?;
            let mut span = self.span(ExecKind::Query, &spec.type_name);

            let ids = self
                .executor
                .set_members(&value_lookup_key(spec, field, value)?)?;
            span.set_rows(ids.len() as u64);

            Ok(ids)
        })
    }

    /// Ids of `R` with `min <= field <= max`, ascending by value.
    pub fn find_ids_by_range<R: Record>(
        &self,
        field: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<String>, Error> {
        self.with_metrics(|| -> Result<Vec<String>, Error> {
            let spec = self.registry.spec_for::<R>()?;
            let mut span = self.span(ExecKind::Query, &spec.type_name);

            let ids = self
                .executor
                .sorted_range_by_score(&range_lookup_key(spec, field)?, min, max)?;
            span.set_rows(ids.len() as u64);

            Ok(ids)
        })
    }

    /// Records of `R` whose indexed `field` equals `value`, in id order.
    pub fn find_by_value<R: Record>(&self, field: &str, value: &Value) -> Result<Vec<R>, Error> {
        let ids = self.find_ids_by_value::<R>(field, value)?;
        let mut records = Vec::with_capacity(ids.len());

        for id in &ids {
            match self.find::<R>(id) {
                Ok(record) => records.push(record),
                Err(err) if err.is_not_found() => {
                    tracing::warn!(
                        type_name = R::TYPE_NAME,
                        id = %id,
                        field,
                        "stale index membership"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Ok(records)
    }

    /// Re-add every index membership implied by stored records of `R`.
    /// Returns the number of records visited.
    pub fn reindex<R: Record>(&self) -> Result<usize, Error> {
        self.with_metrics(|| -> Result<usize, Error> {
            let spec = self.registry.spec_for::<R>()?;
            let mut span = self.span(ExecKind::Save, &spec.type_name);
            let mut visited = 0usize;

            for id in self.executor.set_members(&all_key(&spec.type_name))? {
                let Some(state) = load_state(&self.executor, spec, &id)? else {
                    continue;
                };
                let ops = index_mutations_for_save(spec, None, &state)?;
                let batch = CommitBatch {
                    index_inserts: ops.len() as u64,
                    commands: ops.into_iter().map(Command::from).collect(),
                    ..CommitBatch::default()
                };
                commit(&self.executor, &spec.type_name, &batch)?;

                span.event(MetricsEvent::IndexDelta {
                    type_name: &spec.type_name,
                    inserts: batch.index_inserts,
                    removes: batch.index_removes,
                });
                visited += 1;
            }
            span.set_rows(visited as u64);

            tracing::debug!(type_name = %spec.type_name, visited, "reindexed");

            Ok(visited)
        })
    }

    // ---------------------------------------------------------------------
    // Metrics wiring
    // ---------------------------------------------------------------------

    fn with_metrics<T>(&self, f: impl FnOnce() -> T) -> T {
        match &self.metrics {
            Some(sink) => with_metrics_sink(Rc::clone(sink), f),
            None => f(),
        }
    }

    fn span<'s>(&self, kind: ExecKind, type_name: &'s str) -> Span<'s> {
        Span::new(kind, type_name, self.config.observability.metrics)
    }
}
