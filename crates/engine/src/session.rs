//! Sessions
//!
//! A [`Session`] lives for one mutation cycle (one reduction) or one
//! selector evaluation. It wraps a store state, records which entity tables
//! were read, and applies update messages to produce the next state.
//!
//! # Application
//!
//! Messages are applied immediately and in submission order. Each message
//! is applied to a working copy of the state and committed only when it
//! (and any cascade it triggers) succeeds, so a failing message leaves
//! every table as it was. Messages committed earlier stay committed.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::sync::Arc;

use strata_orm_core::{Message, OrmError, OrmResult};
use strata_orm_storage::{StoreState, Table};

use crate::cascade::delete_with_cascade;
use crate::model::ModelClass;
use crate::schema::Schema;

/// Per-cycle coordinator over one store state.
///
/// Not `Sync`: a session belongs to the single invocation that created it.
#[derive(Debug)]
pub struct Session {
    schema: Arc<Schema>,
    state: StoreState,
    accessed: RefCell<BTreeSet<String>>,
    messages: Vec<(String, Message)>,
}

impl Session {
    /// Open a session over an existing state.
    pub fn new(schema: Arc<Schema>, state: StoreState) -> Self {
        Session {
            schema,
            state,
            accessed: RefCell::new(BTreeSet::new()),
            messages: Vec::new(),
        }
    }

    /// Open a session over the schema's default (empty) state.
    pub fn with_default_state(schema: Arc<Schema>) -> Self {
        let state = schema.default_state();
        Session::new(schema, state)
    }

    /// Schema this session serves.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Current state, including every message applied so far.
    ///
    /// Reads through here are not tracked; outside the engine, tables are
    /// read with [`Session::get_table_state`].
    pub(crate) fn state(&self) -> &StoreState {
        &self.state
    }

    /// Finish the session, yielding its state.
    pub fn into_state(self) -> StoreState {
        self.state
    }

    /// Model class of a registered entity.
    pub fn class(&self, entity: &str) -> OrmResult<ModelClass> {
        self.schema.class(entity)
    }

    // =========================================================================
    // Access tracking
    // =========================================================================

    /// Record that `entity` was read during this session.
    pub fn mark_accessed(&self, entity: &str) {
        let mut accessed = self.accessed.borrow_mut();
        if !accessed.contains(entity) {
            tracing::trace!(entity = %entity, "table accessed");
            accessed.insert(entity.to_string());
        }
    }

    /// Entities read so far, sorted.
    pub fn accessed_entities(&self) -> Vec<String> {
        self.accessed.borrow().iter().cloned().collect()
    }

    /// Check whether an entity has been read.
    pub fn was_accessed(&self, entity: &str) -> bool {
        self.accessed.borrow().contains(entity)
    }

    /// Table of `entity` in the current state, marking it accessed.
    ///
    /// An entity without a table in the state reads as an empty table.
    pub fn get_table_state(&self, entity: &str) -> Arc<Table> {
        self.mark_accessed(entity);
        self.table(entity)
    }

    /// Table of `entity` without marking it accessed.
    pub(crate) fn table(&self, entity: &str) -> Arc<Table> {
        self.state
            .table(entity)
            .cloned()
            .unwrap_or_else(|| Arc::new(self.schema.empty_table(entity)))
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Apply a message to `entity`'s table.
    ///
    /// # Errors
    ///
    /// - `UnknownEntity` if the schema does not register `entity`
    /// - whatever the table operation or cascade fails with
    pub fn add_update(&mut self, entity: &str, message: Message) -> OrmResult<()> {
        let def = self
            .schema
            .entity(entity)
            .cloned()
            .ok_or_else(|| OrmError::unknown_entity(entity))?;

        let mut working = self.state.clone();
        let table = self.table(entity);
        match &message {
            Message::Create(record) => working.put_table(table.insert(record.clone())?),
            Message::Update(payload) => {
                working.put_table(table.update(&payload.id_arr, &payload.merge_obj)?)
            }
            Message::Delete(ids) => delete_with_cascade(&self.schema, &mut working, entity, ids)?,
            Message::Custom { kind, payload } => {
                let next = match def.update_handler() {
                    Some(handler) => handler.apply_custom(&table, kind, payload)?,
                    None => None,
                };
                match next {
                    Some(next) if next.name() != entity => {
                        return Err(OrmError::invalid_record(
                            entity,
                            format!("{} produced a table for {}", kind, next.name()),
                        ))
                    }
                    Some(next) => working.put_table(next),
                    None => {
                        tracing::trace!(entity = %entity, kind = %kind, "custom message ignored")
                    }
                }
            }
        }

        tracing::debug!(
            entity = %entity,
            message_type = %message.message_type(),
            "applied update"
        );
        self.state = working;
        self.messages.push((entity.to_string(), message));
        Ok(())
    }

    /// Messages applied in this session, in order.
    pub fn messages(&self) -> &[(String, Message)] {
        &self.messages
    }

    /// Check that `class` belongs to this session's schema.
    ///
    /// # Errors
    ///
    /// `NotConnected` if the schema registers no entity by that name, or
    /// registers a different definition under it.
    pub fn bind(&self, class: &ModelClass) -> OrmResult<()> {
        match self.schema.entity(class.name()) {
            Some(def) if Arc::ptr_eq(def, class.def()) => Ok(()),
            _ => Err(OrmError::not_connected(class.name())),
        }
    }
}
