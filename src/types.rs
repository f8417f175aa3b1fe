//! Public types for the Strata ORM.
//!
//! This module re-exports types from the internal crates with a flat public interface.

// ============================================================================
// Data types
// ============================================================================

// Identifiers and records
pub use strata_orm_core::{Id, Record, Value, ID_FIELD};

// Update messages (wire contract)
pub use strata_orm_core::{Message, MessageError, UpdatePayload, CREATE, DELETE, UPDATE};

// Errors
pub use strata_orm_core::{OrmError, OrmResult};

// ============================================================================
// Storage
// ============================================================================

pub use strata_orm_storage::{StoreState, Table, TableMeta};

// ============================================================================
// Schema, sessions and facades
// ============================================================================

pub use strata_orm_engine::{
    EntityDef, FieldDescriptor, Junction, OnDelete, Schema, SchemaBuilder, SchemaOptions,
};
pub use strata_orm_engine::{Model, ModelClass, RelationAccessor, Session};
pub use strata_orm_engine::{handler_fn, UpdateHandler};
pub use strata_orm_engine::{default_updater, make_reducer, ReduceError, Reducer};

// ============================================================================
// Selectors
// ============================================================================

pub use strata_orm_selector::{
    create_selector, create_selector_with, create_selector_with_options, ComposedSelector,
    MemoizeOptions, MemoizedSelector, Selector,
};
