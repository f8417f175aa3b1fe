//! Identifier type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of a record within one entity table.
///
/// Ids are unsigned integers, unique per table. They appear inside records
/// (the `id` attribute and foreign-key attributes) as plain JSON numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(u64);

impl Id {
    /// Create an id from its raw value.
    pub const fn new(raw: u64) -> Self {
        Id(raw)
    }

    /// Raw numeric value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The id following this one in an auto-increment sequence, or `None`
    /// past `u64::MAX`.
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(raw) => Some(Id(raw)),
            None => None,
        }
    }

    /// Read an id out of a JSON value.
    ///
    /// Only non-negative integers are ids; anything else (including `null`)
    /// yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_u64().map(Id)
    }

    /// Read a list of ids out of a JSON array.
    ///
    /// Returns `None` if the value is not an array or any element is not an id.
    pub fn list_from_value(value: &Value) -> Option<Vec<Self>> {
        value.as_array()?.iter().map(Id::from_value).collect()
    }

    /// JSON representation of this id.
    pub fn to_value(self) -> Value {
        Value::from(self.0)
    }
}

impl From<u64> for Id {
    fn from(raw: u64) -> Self {
        Id(raw)
    }
}

impl From<Id> for u64 {
    fn from(id: Id) -> Self {
        id.0
    }
}

impl From<Id> for Value {
    fn from(id: Id) -> Self {
        id.to_value()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
