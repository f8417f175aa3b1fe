//! Many-to-many relation accessors
//!
//! A [`RelationAccessor`] is produced per (record, relation field). It reads
//! the related ids out of the junction table once, when it is produced, and
//! turns `add` / `remove` into junction-table messages. Accessors are not
//! refreshed by their own writes: produce a new one to observe them.

use std::collections::BTreeSet;

use strata_orm_core::{Id, Message, OrmError, OrmResult, Record};

use crate::model::Model;
use crate::schema::Junction;
use crate::session::Session;

/// Related ids of one record through one many-to-many field.
#[derive(Debug, Clone)]
pub struct RelationAccessor {
    junction: Junction,
    from_id: Id,
    id_arr: Vec<Id>,
}

impl RelationAccessor {
    /// Read the related ids, marking the junction entity accessed.
    pub(crate) fn load(session: &Session, junction: Junction, from_id: Id) -> Self {
        let table = session.get_table_state(&junction.name);
        let id_arr = table
            .ids_referencing(&junction.from_field, from_id)
            .into_iter()
            .filter_map(|row| table.get_by_id(row)?.reference(&junction.to_field))
            .collect();
        RelationAccessor {
            junction,
            from_id,
            id_arr,
        }
    }

    /// Related target ids, in the order the relations were added.
    pub fn ids(&self) -> &[Id] {
        &self.id_arr
    }

    /// Check if a target id is related.
    pub fn contains(&self, id: Id) -> bool {
        self.id_arr.contains(&id)
    }

    /// Number of related records.
    pub fn len(&self) -> usize {
        self.id_arr.len()
    }

    /// Check if nothing is related.
    pub fn is_empty(&self) -> bool {
        self.id_arr.is_empty()
    }

    /// Junction behind this relation.
    pub fn junction(&self) -> &Junction {
        &self.junction
    }

    /// Facades for the related records.
    pub fn models(&self, session: &Session) -> OrmResult<Vec<Model>> {
        let target = session.class(&self.junction.target)?;
        Ok(target
            .access_ids(session, &self.id_arr)?
            .into_iter()
            .filter_map(|record| record.id().map(|id| target.instance(id, record)))
            .collect())
    }

    /// Relate target ids. Sends one junction CREATE per id.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the owning record or a target does not exist
    /// - `RelationExists` if a pair is already related (or listed twice)
    pub fn add(&self, session: &mut Session, ids: &[Id]) -> OrmResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let j = &self.junction;
        if !session.table(&j.owner).contains(self.from_id) {
            return Err(OrmError::not_found(j.owner.clone(), self.from_id));
        }

        let targets = session.table(&j.target);
        let mut related = self.current_targets(session);
        for id in ids {
            if !targets.contains(*id) {
                return Err(OrmError::not_found(j.target.clone(), *id));
            }
            if !related.insert(*id) {
                return Err(OrmError::RelationExists {
                    entity: j.owner.clone(),
                    field: j.field.clone(),
                    from: self.from_id,
                    to: *id,
                });
            }
        }

        for id in ids {
            let mut row = Record::new();
            row.insert(j.from_field.clone(), self.from_id);
            row.insert(j.to_field.clone(), *id);
            session.add_update(&j.name, Message::create(row))?;
        }
        Ok(())
    }

    /// Unrelate target ids. Sends a single junction DELETE.
    ///
    /// # Errors
    ///
    /// `NotFound` if an id is not currently related.
    pub fn remove(&self, session: &mut Session, ids: &[Id]) -> OrmResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let j = &self.junction;
        let table = session.table(&j.name);
        let rows = table.ids_referencing(&j.from_field, self.from_id);

        let mut doomed = Vec::with_capacity(ids.len());
        for id in ids {
            let row = rows.iter().copied().find(|row| {
                !doomed.contains(row)
                    && table
                        .get_by_id(*row)
                        .and_then(|r| r.reference(&j.to_field))
                        == Some(*id)
            });
            match row {
                Some(row) => doomed.push(row),
                None => return Err(OrmError::not_found(j.target.clone(), *id)),
            }
        }
        session.add_update(&j.name, Message::delete(doomed))
    }

    /// Unrelate everything this accessor saw as related.
    pub fn clear(&self, session: &mut Session) -> OrmResult<()> {
        self.remove(session, &self.id_arr)
    }

    fn current_targets(&self, session: &Session) -> BTreeSet<Id> {
        let table = session.table(&self.junction.name);
        table
            .ids_referencing(&self.junction.from_field, self.from_id)
            .into_iter()
            .filter_map(|row| table.get_by_id(row)?.reference(&self.junction.to_field))
            .collect()
    }
}
