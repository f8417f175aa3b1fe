//! Strata ORM
//!
//! A normalized, immutable relational store driven by update messages,
//! with selectors that recompute only when the tables they read change.
//!
//! ```ignore
//! use strata_orm::*;
//!
//! let schema = Schema::builder()
//!     .register(EntityDef::new("Book").field("authorId", FieldDescriptor::foreign_key("Author")))
//!     .register(EntityDef::new("Author"))
//!     .build()?;
//! let reducer = make_reducer(schema.clone());
//! let state = reducer.reduce(None, &message)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;

pub use strata_orm_core::record;
pub use types::*;
