//! Core types for the Strata ORM
//!
//! This crate defines the vocabulary shared by every other layer:
//! - [`Id`]: identifier of one record within its entity table
//! - [`Record`]: ordered attribute map for one normalized entity instance
//! - [`Message`]: the unit of mutation intent (CREATE / UPDATE / DELETE / custom)
//! - [`OrmError`] / [`OrmResult`]: the error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod message;
pub mod record;
pub mod types;

pub use error::{OrmError, OrmResult};
pub use message::{Message, MessageError, UpdatePayload, CREATE, DELETE, UPDATE};
pub use record::{Record, ID_FIELD};
pub use types::Id;

// Used by the `record!` macro so callers don't need their own serde_json dependency.
#[doc(hidden)]
pub use serde_json as __serde_json;

pub use serde_json::Value;
