//! Entity update logic
//!
//! An entity opts into reacting to dispatched messages by registering an
//! [`UpdateHandler`]. The default updater calls every registered handler,
//! in entity registration order, once per reduced message.

use strata_orm_core::{Message, OrmResult, Value};
use strata_orm_storage::Table;

use crate::model::ModelClass;
use crate::session::Session;

/// Update logic attached to an entity.
pub trait UpdateHandler: Send + Sync {
    /// React to a dispatched message.
    ///
    /// `table` is the entity's table as of the moment the handler is called.
    /// Writes go through `class` (or `session.add_update`). Messages the
    /// handler does not recognize should be ignored, not treated as errors.
    fn reduce(
        &self,
        table: &Table,
        message: &Message,
        class: &ModelClass,
        session: &mut Session,
    ) -> OrmResult<()>;

    /// Apply a custom message sent to this entity through the session.
    ///
    /// Returns the entity's next table, or `None` to leave it unchanged.
    fn apply_custom(&self, table: &Table, kind: &str, payload: &Value) -> OrmResult<Option<Table>> {
        let _ = (table, kind, payload);
        Ok(None)
    }
}

/// Handler built from a closure. See [`handler_fn`].
pub struct FnHandler<F>(F);

/// Wrap a closure as an [`UpdateHandler`].
///
/// ```ignore
/// EntityDef::new("Book").handler(handler_fn(|_table, message, class, session| {
///     if message.message_type() == "ADD_BOOK" {
///         class.create(session, Record::from_value(message.payload()).unwrap_or_default())?;
///     }
///     Ok(())
/// }))
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&Table, &Message, &ModelClass, &mut Session) -> OrmResult<()> + Send + Sync,
{
    FnHandler(f)
}

impl<F> UpdateHandler for FnHandler<F>
where
    F: Fn(&Table, &Message, &ModelClass, &mut Session) -> OrmResult<()> + Send + Sync,
{
    fn reduce(
        &self,
        table: &Table,
        message: &Message,
        class: &ModelClass,
        session: &mut Session,
    ) -> OrmResult<()> {
        (self.0)(table, message, class, session)
    }
}
