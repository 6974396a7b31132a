use crate::{
    db::{
        key::validate_id,
        registry::Registry,
        relation::RelationError,
        state::{RecordState, record_exists},
        store::CommandExecutor,
    },
    error::Error,
    model::ModelSpec,
};

/// Check every reference a save candidate carries.
///
/// Targets must be registered and every referenced id must be stored. Empty
/// references are valid and cost no store round-trip. Returns the number of
/// existence lookups performed.
pub fn validate_relations<X: CommandExecutor>(
    registry: &Registry,
    executor: &X,
    spec: &ModelSpec,
    state: &RecordState,
) -> Result<u64, Error> {
    let mut lookups = 0u64;

    for field in spec.relational_fields() {
        let Some(relation) = field.relation() else {
            continue;
        };
        let Some(value) = state.get(&field.struct_name) else {
            continue;
        };

        // Phase 1: collect referenced ids; nothing to check when unset.
        let ids = value.referenced_ids();
        if ids.is_empty() {
            continue;
        }

        // Phase 2: the target type must be known.
        let Ok(target) = registry.spec(&relation.target) else {
            return Err(RelationError::UnregisteredType {
                type_name: spec.type_name.clone(),
                field: field.struct_name.clone(),
                target: relation.target.clone(),
            }
            .into());
        };

        // Phase 3: every referenced id must exist under the target namespace.
        // Ids that could only address a non-record key never exist.
        for id in ids {
            let valid = validate_id(target, id).is_ok();
            if valid {
                lookups += 1;
            }
            if !valid || !record_exists(executor, &relation.target, id)? {
                tracing::warn!(
                    type_name = %spec.type_name,
                    field = %field.struct_name,
                    target = %relation.target,
                    id,
                    "dangling reference rejected"
                );

                return Err(RelationError::DanglingReference {
                    type_name: spec.type_name.clone(),
                    field: field.struct_name.clone(),
                    target: relation.target.clone(),
                    id: id.to_string(),
                }
                .into());
            }
        }
    }

    Ok(lookups)
}
