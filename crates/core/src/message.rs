//! Update messages
//!
//! Messages are the only way mutation is expressed. A session applies each
//! message to one entity's table; the built-in kinds map onto table
//! operations and anything else is handed to the entity's own update logic.
//!
//! # Wire format
//!
//! ```text
//! {"type": "CREATE", "payload": {"id": 0, "name": "Tommi"}}
//! {"type": "UPDATE", "payload": {"idArr": [0], "mergeObj": {"name": "Matt"}}}
//! {"type": "DELETE", "payload": [7]}
//! {"type": "ADD_BOOK", "payload": <anything>}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::record::Record;
use crate::types::Id;

/// Message type of a record creation.
pub const CREATE: &str = "CREATE";
/// Message type of a shallow merge into existing records.
pub const UPDATE: &str = "UPDATE";
/// Message type of a record deletion.
pub const DELETE: &str = "DELETE";

/// Payload of an UPDATE message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePayload {
    /// Records to merge into. Every id must exist.
    #[serde(rename = "idArr")]
    pub id_arr: Vec<Id>,
    /// Attributes to shallow-merge into each record.
    #[serde(rename = "mergeObj")]
    pub merge_obj: Record,
}

/// A unit of mutation intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMessage", into = "RawMessage")]
pub enum Message {
    /// Insert one record. An id is assigned if the record has none.
    Create(Record),
    /// Shallow-merge attributes into existing records.
    Update(UpdatePayload),
    /// Remove records (cascades are applied by the session).
    Delete(Vec<Id>),
    /// Any other message type, interpreted by entity update logic.
    Custom {
        /// The message `type` string.
        kind: String,
        /// Opaque payload.
        payload: Value,
    },
}

impl Message {
    /// Build a CREATE message.
    pub fn create(record: Record) -> Self {
        Message::Create(record)
    }

    /// Build an UPDATE message.
    pub fn update(id_arr: Vec<Id>, merge_obj: Record) -> Self {
        Message::Update(UpdatePayload { id_arr, merge_obj })
    }

    /// Build a DELETE message.
    pub fn delete(ids: Vec<Id>) -> Self {
        Message::Delete(ids)
    }

    /// Build a custom message.
    pub fn custom(kind: impl Into<String>, payload: impl Into<Value>) -> Self {
        Message::Custom {
            kind: kind.into(),
            payload: payload.into(),
        }
    }

    /// Decode a message from its `type` and `payload` parts.
    ///
    /// Built-in type names require a payload of the matching shape.
    pub fn from_parts(kind: &str, payload: Value) -> Result<Self, MessageError> {
        let invalid = |source: serde_json::Error| MessageError::InvalidPayload {
            kind: kind.to_string(),
            source,
        };
        match kind {
            CREATE => Record::from_value(payload)
                .map(Message::Create)
                .ok_or_else(|| MessageError::NotAnObject(kind.to_string())),
            UPDATE => serde_json::from_value(payload)
                .map(Message::Update)
                .map_err(invalid),
            DELETE => serde_json::from_value(payload)
                .map(Message::Delete)
                .map_err(invalid),
            _ => Ok(Message::Custom {
                kind: kind.to_string(),
                payload,
            }),
        }
    }

    /// The message `type` string.
    pub fn message_type(&self) -> &str {
        match self {
            Message::Create(_) => CREATE,
            Message::Update(_) => UPDATE,
            Message::Delete(_) => DELETE,
            Message::Custom { kind, .. } => kind,
        }
    }

    /// Check if this is one of CREATE, UPDATE or DELETE.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, Message::Custom { .. })
    }

    /// Encode the payload as JSON.
    pub fn payload(&self) -> Value {
        match self {
            Message::Create(record) => record.clone().into_value(),
            Message::Update(p) => {
                let mut map = Map::new();
                map.insert("idArr".to_string(), ids_to_value(&p.id_arr));
                map.insert("mergeObj".to_string(), p.merge_obj.clone().into_value());
                Value::Object(map)
            }
            Message::Delete(ids) => ids_to_value(ids),
            Message::Custom { payload, .. } => payload.clone(),
        }
    }
}

fn ids_to_value(ids: &[Id]) -> Value {
    Value::Array(ids.iter().map(|id| id.to_value()).collect())
}

/// Errors decoding a message from its wire form.
#[derive(Debug, Error)]
pub enum MessageError {
    /// A CREATE payload was not a JSON object.
    #[error("{0} payload must be an object")]
    NotAnObject(String),

    /// A built-in payload did not have the expected shape.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        /// Message type.
        kind: String,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Wire shape: `{"type": ..., "payload": ...}`.
#[derive(Serialize, Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

impl TryFrom<RawMessage> for Message {
    type Error = MessageError;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        Message::from_parts(&raw.kind, raw.payload)
    }
}

impl From<Message> for RawMessage {
    fn from(message: Message) -> Self {
        RawMessage {
            kind: message.message_type().to_string(),
            payload: message.payload(),
        }
    }
}
