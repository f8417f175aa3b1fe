//! Storage layer for the Strata ORM
//!
//! - [`Table`]: immutable id → record collection for one entity
//! - [`StoreState`]: immutable entity → table snapshot
//!
//! Nothing here mutates in place. Every write yields a new value, and
//! untouched tables and records are shared between old and new.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod state;
pub mod table;

pub use state::StoreState;
pub use table::{FkIndex, Table, TableMeta};
