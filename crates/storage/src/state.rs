//! Store state snapshots
//!
//! [`StoreState`] is the whole normalized database at one point in time:
//! entity name → table. Tables are held behind `Arc`, so cloning a state is
//! cheap and two states produced from one another share every table that
//! was not replaced.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::table::Table;

/// Immutable snapshot of every entity table.
///
/// Equality (`==`) compares table contents. Use [`StoreState::same_table`]
/// to compare table identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    tables: BTreeMap<String, Arc<Table>>,
}

impl StoreState {
    /// Create a state with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from a set of tables, keyed by table name.
    pub fn from_tables<I: IntoIterator<Item = Table>>(tables: I) -> Self {
        StoreState {
            tables: tables
                .into_iter()
                .map(|t| (t.name().to_string(), Arc::new(t)))
                .collect(),
        }
    }

    /// Table for an entity, if present.
    pub fn table(&self, entity: &str) -> Option<&Arc<Table>> {
        self.tables.get(entity)
    }

    /// Check if the state holds a table for an entity.
    pub fn contains(&self, entity: &str) -> bool {
        self.tables.contains_key(entity)
    }

    /// Entity names, sorted.
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// (entity, table) pairs, sorted by entity name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Table>)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if the state holds no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// A new state with `table` replacing the table of the same name.
    pub fn with_table(&self, table: Table) -> StoreState {
        let mut next = self.clone();
        next.put_table(table);
        next
    }

    /// Replace the table of the same name in place.
    ///
    /// For building a successor state from a working copy; the previous
    /// table object is left untouched for anyone still holding it.
    pub fn put_table(&mut self, table: Table) {
        self.tables
            .insert(table.name().to_string(), Arc::new(table));
    }

    /// Check whether both states hold the very same table object for an
    /// entity (or neither holds one).
    pub fn same_table(&self, other: &StoreState, entity: &str) -> bool {
        match (self.table(entity), other.table(entity)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}
