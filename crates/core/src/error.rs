//! Error types for the Strata ORM.
//!
//! Every table, session and facade operation fails fast with an [`OrmError`].
//! Unrecognized custom message types are deliberately not an error: each
//! entity ignores messages it does not handle.

use thiserror::Error;

use crate::types::Id;

/// Result alias used throughout the ORM crates.
pub type OrmResult<T> = Result<T, OrmError>;

/// Errors raised by tables, sessions and entity facades.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrmError {
    /// A model class was used with a session whose schema does not register it.
    #[error("model {entity} is not connected to this session")]
    NotConnected {
        /// Entity name of the model class.
        entity: String,
    },

    /// An UPDATE or relation operation referenced an absent id.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Entity whose table was searched.
        entity: String,
        /// The missing id.
        id: Id,
    },

    /// A CREATE collided with an existing id.
    #[error("{entity} with id {id} already exists")]
    DuplicateId {
        /// Entity being inserted into.
        entity: String,
        /// The colliding id.
        id: Id,
    },

    /// A DELETE would leave a required foreign key dangling.
    #[error(
        "deleting {entity} {id} would orphan {dependent}.{field}, which is required and has no delete policy"
    )]
    CascadeRequired {
        /// Entity being deleted from.
        entity: String,
        /// Deleted id that is still referenced.
        id: Id,
        /// Entity holding the foreign key.
        dependent: String,
        /// Foreign-key field on the dependent entity.
        field: String,
    },

    /// A many-to-many `add` named a pair that is already related.
    #[error("{entity}.{field}: {from} is already related to {to}")]
    RelationExists {
        /// Entity owning the relation field.
        entity: String,
        /// Relation field name.
        field: String,
        /// Source record id.
        from: Id,
        /// Target record id.
        to: Id,
    },

    /// A record or message payload is malformed.
    #[error("invalid {entity} record: {reason}")]
    InvalidRecord {
        /// Entity the record belongs to.
        entity: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An entity name is not registered in the schema.
    #[error("unknown entity: {entity}")]
    UnknownEntity {
        /// The unregistered name.
        entity: String,
    },

    /// A relation field is not declared on the entity.
    #[error("{entity} has no relation field {field}")]
    UnknownField {
        /// Entity that was searched.
        entity: String,
        /// The undeclared field.
        field: String,
    },

    /// Schema registration failed validation.
    #[error("schema error: {0}")]
    Schema(String),
}

impl OrmError {
    /// Create a NotConnected error.
    pub fn not_connected(entity: impl Into<String>) -> Self {
        OrmError::NotConnected {
            entity: entity.into(),
        }
    }

    /// Create a NotFound error.
    pub fn not_found(entity: impl Into<String>, id: Id) -> Self {
        OrmError::NotFound {
            entity: entity.into(),
            id,
        }
    }

    /// Create a DuplicateId error.
    pub fn duplicate_id(entity: impl Into<String>, id: Id) -> Self {
        OrmError::DuplicateId {
            entity: entity.into(),
            id,
        }
    }

    /// Create an InvalidRecord error.
    pub fn invalid_record(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        OrmError::InvalidRecord {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Create an UnknownEntity error.
    pub fn unknown_entity(entity: impl Into<String>) -> Self {
        OrmError::UnknownEntity {
            entity: entity.into(),
        }
    }

    /// Create an UnknownField error.
    pub fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        OrmError::UnknownField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create a Schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        OrmError::Schema(msg.into())
    }

    /// Check if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, OrmError::NotFound { .. })
    }

    /// Check if this is a DuplicateId error.
    pub fn is_duplicate_id(&self) -> bool {
        matches!(self, OrmError::DuplicateId { .. })
    }

    /// Check if this is a CascadeRequired error.
    pub fn is_cascade_required(&self) -> bool {
        matches!(self, OrmError::CascadeRequired { .. })
    }

    /// Check if this is a NotConnected error.
    pub fn is_not_connected(&self) -> bool {
        matches!(self, OrmError::NotConnected { .. })
    }
}
