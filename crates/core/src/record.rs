//! Normalized records.
//!
//! A [`Record`] is one entity instance: a flat, ordered mapping from
//! attribute name to JSON value. Relations are stored as ids (foreign keys)
//! or live in junction tables (many-to-many); records never nest objects
//! of other entities.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::types::Id;

/// Name of the attribute holding a record's own id.
pub const ID_FIELD: &str = "id";

/// One normalized entity instance.
///
/// Attribute order is insertion order. Merging a key that already exists
/// keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Record(Map::new())
    }

    /// Wrap an existing JSON object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Record(map)
    }

    /// Convert a JSON value into a record.
    ///
    /// Returns `None` unless the value is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Record(map)),
            _ => None,
        }
    }

    /// Unwrap into the underlying JSON object.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Convert into a JSON object value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// The record's own id, if it has a well-formed `id` attribute.
    pub fn id(&self) -> Option<Id> {
        self.0.get(ID_FIELD).and_then(Id::from_value)
    }

    /// Return a copy with `id` set, placed as the first attribute.
    pub fn with_id(&self, id: Id) -> Record {
        let mut map = Map::with_capacity(self.0.len() + 1);
        map.insert(ID_FIELD.to_string(), id.to_value());
        for (key, value) in &self.0 {
            if key != ID_FIELD {
                map.insert(key.clone(), value.clone());
            }
        }
        Record(map)
    }

    /// Read the id stored in a foreign-key attribute.
    ///
    /// `null`, missing and malformed values all read as "no reference".
    pub fn reference(&self, attr: &str) -> Option<Id> {
        self.0.get(attr).and_then(Id::from_value)
    }

    /// Get an attribute value.
    pub fn get(&self, attr: &str) -> Option<&Value> {
        self.0.get(attr)
    }

    /// Set an attribute, returning the previous value.
    pub fn insert(&mut self, attr: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(attr.into(), value.into())
    }

    /// Remove an attribute, preserving the order of the remaining ones.
    pub fn remove(&mut self, attr: &str) -> Option<Value> {
        if !self.0.contains_key(attr) {
            return None;
        }
        let mut removed = None;
        let map = std::mem::take(&mut self.0);
        for (key, value) in map {
            if key == attr {
                removed = Some(value);
            } else {
                self.0.insert(key, value);
            }
        }
        removed
    }

    /// Check whether an attribute is present.
    pub fn contains_key(&self, attr: &str) -> bool {
        self.0.contains_key(attr)
    }

    /// Attribute names in order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Attribute entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the record has no attributes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shallow merge: a new record with every attribute of `patch` set.
    pub fn merged(&self, patch: &Record) -> Record {
        let mut map = self.0.clone();
        for (key, value) in &patch.0 {
            map.insert(key.clone(), value.clone());
        }
        Record(map)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Record(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Record(iter.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Renders as `{id: 0, name: Tommi}`: strings unquoted, other values as JSON.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match value {
                Value::String(s) => write!(f, "{}: {}", key, s)?,
                other => write!(f, "{}: {}", key, other)?,
            }
        }
        f.write_str("}")
    }
}

/// Build a [`Record`] from `"attr" => value` pairs.
///
/// Values go through `serde_json::json!`, so literals, arrays and nested
/// JSON are all accepted.
///
/// ```
/// use strata_orm_core::record;
///
/// let book = record! { "id" => 0, "name" => "Tommi" };
/// assert_eq!(book.to_string(), "{id: 0, name: Tommi}");
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($key:expr => $value:tt),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $(
            record.insert($key, $crate::__serde_json::json!($value));
        )+
        record
    }};
}
