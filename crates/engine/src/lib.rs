//! Mutation engine for the Strata ORM
//!
//! - [`Schema`]: registered entities, their relation fields and update handlers
//! - [`Session`]: one mutation cycle over a store state, with access tracking
//! - [`ModelClass`] / [`Model`]: entity facades translating calls into messages
//! - [`RelationAccessor`]: many-to-many relation reads and writes
//! - [`Reducer`]: the pure `(state, message) → state` function for a host loop

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cascade;
pub mod handler;
pub mod model;
pub mod reducer;
pub mod relation;
pub mod schema;
pub mod session;

pub use handler::{handler_fn, FnHandler, UpdateHandler};
pub use model::{Model, ModelClass};
pub use reducer::{default_updater, make_reducer, ReduceError, Reducer, Updater};
pub use relation::RelationAccessor;
pub use schema::{
    EntityDef, FieldDescriptor, Junction, OnDelete, Schema, SchemaBuilder, SchemaOptions,
};
pub use session::Session;
