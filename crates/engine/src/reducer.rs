//! Reducer construction
//!
//! A [`Reducer`] is the pure `(prior state, message) → next state` function
//! exposed to a host dispatch loop. Each call opens a fresh [`Session`] over
//! the prior state, runs the updater, and returns the session's final state.
//! The prior state is never modified.

use std::fmt;
use std::sync::Arc;

use strata_orm_core::{Message, OrmError, OrmResult};
use strata_orm_storage::StoreState;
use thiserror::Error;

use crate::model::ModelClass;
use crate::schema::Schema;
use crate::session::Session;

/// Updater signature: apply one dispatched message through a session.
pub type Updater = dyn Fn(&mut Session, &Message) -> OrmResult<()> + Send + Sync;

/// A reduction failed.
///
/// `state` holds everything applied before the failing message; the
/// failing message itself left no trace.
#[derive(Debug, Error)]
#[error("reduce failed: {source}")]
pub struct ReduceError {
    /// What went wrong.
    #[source]
    pub source: OrmError,
    /// Partially reduced state.
    pub state: StoreState,
}

impl ReduceError {
    /// Split into the error and the partial state.
    pub fn into_parts(self) -> (OrmError, StoreState) {
        (self.source, self.state)
    }
}

/// Run every registered update handler, in registration order.
pub fn default_updater(session: &mut Session, message: &Message) -> OrmResult<()> {
    let schema = session.schema().clone();
    for def in schema.entities() {
        let Some(handler) = def.update_handler() else {
            continue;
        };
        let class = ModelClass::from_def(def.clone());
        let table = session.table(def.name());
        handler.reduce(&table, message, &class, session)?;
    }
    Ok(())
}

/// Pure reduction function over store states.
#[derive(Clone)]
pub struct Reducer {
    schema: Arc<Schema>,
    updater: Arc<Updater>,
}

impl Reducer {
    /// Reducer running [`default_updater`].
    pub fn new(schema: Arc<Schema>) -> Self {
        Reducer {
            schema,
            updater: Arc::new(default_updater),
        }
    }

    /// Reducer running a custom updater.
    pub fn with_updater<F>(schema: Arc<Schema>, updater: F) -> Self
    where
        F: Fn(&mut Session, &Message) -> OrmResult<()> + Send + Sync + 'static,
    {
        Reducer {
            schema,
            updater: Arc::new(updater),
        }
    }

    /// Schema this reducer serves.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Reduce one message.
    ///
    /// `None` starts from the schema's default state.
    pub fn reduce(
        &self,
        prior: Option<&StoreState>,
        message: &Message,
    ) -> Result<StoreState, ReduceError> {
        let mut session = match prior {
            Some(state) => Session::new(self.schema.clone(), state.clone()),
            None => Session::with_default_state(self.schema.clone()),
        };
        tracing::debug!(message_type = %message.message_type(), "reducing");
        match (self.updater)(&mut session, message) {
            Ok(()) => Ok(session.into_state()),
            Err(source) => Err(ReduceError {
                source,
                state: session.into_state(),
            }),
        }
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reducer")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Build a reducer running the default updater.
pub fn make_reducer(schema: Arc<Schema>) -> Reducer {
    Reducer::new(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::schema::{EntityDef, FieldDescriptor};
    use strata_orm_core::{record, Id, Record, Value};
    use strata_orm_storage::Table;

    /// Books react to ADD_BOOK / REMOVE_BOOK and to raw built-in messages.
    fn schema() -> Arc<Schema> {
        Schema::builder()
            .register(EntityDef::new("Author"))
            .register(
                EntityDef::new("Book")
                    .field("authorId", FieldDescriptor::required_foreign_key("Author"))
                    .handler(handler_fn(
                        |_table: &Table, message: &Message, class: &ModelClass, session: &mut Session| {
                            match message.message_type() {
                                "ADD_BOOK" => {
                                    let props = Record::from_value(message.payload())
                                        .unwrap_or_default();
                                    class.create(session, props)?;
                                }
                                "REMOVE_BOOK" => {
                                    let id = Id::from_value(&message.payload())
                                        .unwrap_or_default();
                                    class.with_id(session, id)?.delete(session)?;
                                }
                                _ => {}
                            }
                            Ok(())
                        },
                    )),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_none_starts_from_default_state() {
        let reducer = make_reducer(schema());
        let state = reducer
            .reduce(None, &Message::custom("UNRELATED", Value::Null))
            .unwrap();
        assert_eq!(state, reducer.schema().default_state());
    }

    #[test]
    fn test_handler_drives_mutations() {
        let reducer = make_reducer(schema());
        let s1 = reducer
            .reduce(None, &Message::custom("ADD_BOOK", serde_json::json!({"title": "Dune"})))
            .unwrap();
        assert_eq!(s1.table("Book").unwrap().len(), 1);

        let s2 = reducer
            .reduce(Some(&s1), &Message::custom("REMOVE_BOOK", serde_json::json!(0)))
            .unwrap();
        assert!(s2.table("Book").unwrap().is_empty());
        // Prior state untouched
        assert_eq!(s1.table("Book").unwrap().len(), 1);
        assert!(s1.same_table(&s2, "Author"));
    }

    #[test]
    fn test_create_then_delete_round_trips_by_content() {
        let reducer = make_reducer(schema());
        let s0 = reducer.schema().default_state();
        let s1 = reducer
            .reduce(Some(&s0), &Message::custom("ADD_BOOK", serde_json::json!({"title": "x"})))
            .unwrap();
        let s2 = reducer
            .reduce(Some(&s1), &Message::custom("REMOVE_BOOK", serde_json::json!(0)))
            .unwrap();
        assert_eq!(s2, s0);
    }

    #[test]
    fn test_error_carries_partial_state() {
        let reducer = Reducer::with_updater(schema(), |session, _message| {
            let author = session.class("Author")?;
            author.create(session, record! { "name" => "Herbert" })?;
            session
                .class("Book")?
                .create(session, record! { "title" => "Dune", "authorId" => 0 })?;
            author.with_id(session, Id::new(0))?.delete(session)
        });

        let err = reducer.reduce(None, &Message::custom("GO", Value::Null)).unwrap_err();
        assert!(err.source.is_cascade_required());
        let (_, state) = err.into_parts();
        assert_eq!(state.table("Author").unwrap().len(), 1);
        assert_eq!(state.table("Book").unwrap().len(), 1);
    }

    #[test]
    fn test_reducer_is_deterministic() {
        let reducer = make_reducer(schema());
        let msg = Message::custom("ADD_BOOK", serde_json::json!({"title": "Dune"}));
        let a = reducer.reduce(None, &msg).unwrap();
        let b = reducer.reduce(None, &msg).unwrap();
        assert_eq!(a, b);
    }
}
