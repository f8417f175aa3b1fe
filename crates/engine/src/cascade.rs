//! Delete cascades
//!
//! Deleting records also resolves every foreign key that pointed at them,
//! according to the policy resolved by the schema for that key:
//! - Cascade: delete the dependent records (recursively)
//! - SetNull: null out the reference
//! - Restrict / no policy: fail with `CascadeRequired`
//!
//! Junction rows of many-to-many relations are ordinary cascading
//! dependents, so they are pruned by the same path.

use std::collections::BTreeSet;
use std::sync::Arc;

use strata_orm_core::{Id, OrmError, OrmResult, Record, Value};
use strata_orm_storage::{StoreState, Table};

use crate::schema::{OnDelete, Schema};

/// Delete `ids` from `entity` in `state`, then resolve dependents.
///
/// On error `state` may hold part of the cascade; callers apply this to a
/// working copy and drop it on failure.
pub(crate) fn delete_with_cascade(
    schema: &Schema,
    state: &mut StoreState,
    entity: &str,
    ids: &[Id],
) -> OrmResult<()> {
    let table = current_table(schema, state, entity);
    let live: Vec<Id> = ids
        .iter()
        .copied()
        .filter(|id| table.contains(*id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if live.is_empty() {
        return Ok(());
    }

    // Remove first so self-references and cycles see the rows as gone.
    state.put_table(table.delete(&live));

    for dep in schema.dependents(entity) {
        let dep_table = current_table(schema, state, &dep.entity);
        let mut hits = BTreeSet::new();
        for id in &live {
            let rows = dep_table.ids_referencing(&dep.field, *id);
            if rows.is_empty() {
                continue;
            }
            match dep.policy {
                Some(OnDelete::Cascade) | Some(OnDelete::SetNull) => hits.extend(rows),
                Some(OnDelete::Restrict) | None => {
                    return Err(OrmError::CascadeRequired {
                        entity: entity.to_string(),
                        id: *id,
                        dependent: dep.entity.clone(),
                        field: dep.field.clone(),
                    })
                }
            }
        }
        if hits.is_empty() {
            continue;
        }
        let hits: Vec<Id> = hits.into_iter().collect();

        match dep.policy {
            Some(OnDelete::SetNull) => {
                tracing::debug!(
                    entity = %entity,
                    dependent = %dep.entity,
                    field = %dep.field,
                    rows = hits.len(),
                    "cascade: nulling references"
                );
                let mut patch = Record::new();
                patch.insert(dep.field.clone(), Value::Null);
                state.put_table(dep_table.update(&hits, &patch)?);
            }
            _ => {
                tracing::debug!(
                    entity = %entity,
                    dependent = %dep.entity,
                    field = %dep.field,
                    rows = hits.len(),
                    "cascade: deleting dependents"
                );
                delete_with_cascade(schema, state, &dep.entity, &hits)?;
            }
        }
    }
    Ok(())
}

fn current_table(schema: &Schema, state: &StoreState, entity: &str) -> Arc<Table> {
    state
        .table(entity)
        .cloned()
        .unwrap_or_else(|| Arc::new(schema.empty_table(entity)))
}
