//! Immutable per-entity tables
//!
//! A [`Table`] maps id → record for one entity. Every mutating operation
//! takes `&self` and returns a new table; records that were not touched are
//! shared by reference (`Arc<Record>`) between the old and the new table.
//!
//! # Indices
//!
//! Foreign-key attributes can be indexed. An index maps a referenced id to
//! the set of rows holding that reference, so reverse lookups (cascades,
//! many-to-many junction scans) do not need a full table scan.
//!
//! # Identity contract
//!
//! Callers that cache derived values compare tables by `Arc` identity. That
//! is only sound because a table's content never changes in place: any
//! change produces a new `Table`, and a table that is not touched is never
//! rebuilt.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use strata_orm_core::{Id, OrmError, OrmResult, Record, ID_FIELD};

/// Index of one foreign-key attribute: referenced id → referencing row ids.
pub type FkIndex = BTreeMap<Id, BTreeSet<Id>>;

/// Table bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct TableMeta {
    /// Next id handed out to a record inserted without one.
    pub id_sequence: u64,
    /// Foreign-key indices by attribute name.
    pub indices: BTreeMap<String, FkIndex>,
}

/// Immutable collection of all records of one entity.
#[derive(Debug, Clone)]
pub struct Table {
    name: Arc<str>,
    by_id: BTreeMap<Id, Arc<Record>>,
    meta: TableMeta,
}

impl Table {
    /// Create an empty table with no indices.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Table {
            name: name.into(),
            by_id: BTreeMap::new(),
            meta: TableMeta::default(),
        }
    }

    /// Create an empty table indexing the given foreign-key attributes.
    pub fn with_indices<I, S>(name: impl Into<Arc<str>>, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Table::new(name);
        for attr in attrs {
            table.meta.indices.insert(attr.into(), FkIndex::new());
        }
        table
    }

    /// Set the first id handed out by auto-increment.
    pub fn starting_at(mut self, first_id: u64) -> Self {
        self.meta.id_sequence = self.meta.id_sequence.max(first_id);
        self
    }

    /// Entity name this table belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table bookkeeping (id sequence and indices).
    pub fn meta(&self) -> &TableMeta {
        &self.meta
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Point lookup.
    pub fn get_by_id(&self, id: Id) -> Option<&Arc<Record>> {
        self.by_id.get(&id)
    }

    /// Check if a record with this id exists.
    pub fn contains(&self, id: Id) -> bool {
        self.by_id.contains_key(&id)
    }

    /// All ids, ascending.
    pub fn get_ids(&self) -> Vec<Id> {
        self.by_id.keys().copied().collect()
    }

    /// All records, ascending by id.
    pub fn records(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.by_id.values()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check if the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Id the next insert without an explicit id will receive.
    pub fn next_id(&self) -> Id {
        Id::new(self.meta.id_sequence)
    }

    /// Id for the next insert without an explicit id.
    ///
    /// # Errors
    ///
    /// `InvalidRecord` once the sequence is exhausted, i.e. `u64::MAX` is
    /// taken.
    pub fn allocate_id(&self) -> OrmResult<Id> {
        let id = self.next_id();
        if self.by_id.contains_key(&id) {
            return Err(OrmError::invalid_record(self.name(), "id sequence exhausted"));
        }
        Ok(id)
    }

    /// Check if an attribute is indexed.
    pub fn is_indexed(&self, attr: &str) -> bool {
        self.meta.indices.contains_key(attr)
    }

    /// Ids of rows whose `attr` references `target`, ascending.
    ///
    /// Uses the index when the attribute has one, otherwise scans.
    pub fn ids_referencing(&self, attr: &str, target: Id) -> Vec<Id> {
        match self.meta.indices.get(attr) {
            Some(index) => index
                .get(&target)
                .map(|rows| rows.iter().copied().collect())
                .unwrap_or_default(),
            None => self
                .by_id
                .iter()
                .filter(|(_, record)| record.reference(attr) == Some(target))
                .map(|(id, _)| *id)
                .collect(),
        }
    }

    // =========================================================================
    // Mutations (pure)
    // =========================================================================

    /// Insert a record, assigning the next sequence id if it has none.
    ///
    /// # Errors
    ///
    /// - `DuplicateId` if the record's id is already present
    /// - `InvalidRecord` if the `id` attribute is not an unsigned integer,
    ///   or no id is given and the sequence is exhausted
    pub fn insert(&self, record: Record) -> OrmResult<Table> {
        let (id, record) = match record.get(ID_FIELD) {
            None => {
                let id = self.allocate_id()?;
                (id, record.with_id(id))
            }
            Some(value) => match Id::from_value(value) {
                Some(id) => (id, record),
                None => {
                    return Err(OrmError::invalid_record(
                        self.name(),
                        format!("id must be an unsigned integer, got {}", value),
                    ))
                }
            },
        };

        if self.by_id.contains_key(&id) {
            return Err(OrmError::duplicate_id(self.name(), id));
        }

        let mut next = self.clone();
        next.index_record(id, &record);
        next.by_id.insert(id, Arc::new(record));
        // Saturates at u64::MAX; allocate_id rejects it once taken.
        let after = id.next().map_or(u64::MAX, Id::as_u64);
        next.meta.id_sequence = next.meta.id_sequence.max(after);
        Ok(next)
    }

    /// Shallow-merge `merge` into every record in `ids`.
    ///
    /// All ids are checked before anything is applied.
    ///
    /// # Errors
    ///
    /// - `NotFound` for the first id that does not exist
    /// - `InvalidRecord` if `merge` would change a record's id
    pub fn update(&self, ids: &[Id], merge: &Record) -> OrmResult<Table> {
        for id in ids {
            if !self.by_id.contains_key(id) {
                return Err(OrmError::not_found(self.name(), *id));
            }
        }
        if let Some(value) = merge.get(ID_FIELD) {
            let changes_id = match Id::from_value(value) {
                Some(new_id) => ids.iter().any(|id| *id != new_id),
                None => true,
            };
            if changes_id {
                return Err(OrmError::invalid_record(
                    self.name(),
                    "the id attribute cannot be updated",
                ));
            }
        }

        let mut next = self.clone();
        for id in ids {
            let Some(old) = next.by_id.get(id).cloned() else {
                continue;
            };
            let merged = old.merged(merge);
            next.unindex_record(*id, &old);
            next.index_record(*id, &merged);
            next.by_id.insert(*id, Arc::new(merged));
        }
        Ok(next)
    }

    /// Remove the records in `ids`. Absent ids are skipped.
    ///
    /// Cascades are not performed here.
    pub fn delete(&self, ids: &[Id]) -> Table {
        let mut next = self.clone();
        for id in ids {
            if let Some(old) = next.by_id.remove(id) {
                next.unindex_record(*id, &old);
            }
        }
        next
    }

    fn index_record(&mut self, id: Id, record: &Record) {
        for (attr, index) in self.meta.indices.iter_mut() {
            if let Some(target) = record.reference(attr) {
                index.entry(target).or_default().insert(id);
            }
        }
    }

    fn unindex_record(&mut self, id: Id, record: &Record) {
        for (attr, index) in self.meta.indices.iter_mut() {
            if let Some(target) = record.reference(attr) {
                if let Some(rows) = index.get_mut(&target) {
                    rows.remove(&id);
                    if rows.is_empty() {
                        index.remove(&target);
                    }
                }
            }
        }
    }
}

/// Content equality: same name, same records, same indices.
///
/// The id sequence is allocation bookkeeping and does not take part.
impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.by_id == other.by_id
            && self.meta.indices == other.meta.indices
    }
}
