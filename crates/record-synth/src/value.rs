//! Generated value types.
//!
//! A produced document is a [`Record`]: an insertion-ordered map from labels to
//! [`Value`]s. Insertion order is the evaluation order of the bindings that
//! produced the record, and it is preserved when the record is serialised.

use indexmap::IndexMap;
use serde::Serialize;

/// A labelled record whose keys keep their insertion order.
pub type Record = IndexMap<String, Value>;

/// A single generated value.
///
/// Values form a closed set of shapes: scalars, ordered sequences, and nested
/// records. Serialisation is untagged, so a record renders as a plain JSON
/// object.
///
/// # Example
///
/// ```
/// use record_synth::{Record, Value};
///
/// let mut record = Record::new();
/// record.insert("gender".to_owned(), Value::from("F"));
/// record.insert("children".to_owned(), Value::List(vec![Value::from(2_i64)]));
///
/// let json = serde_json::to_string(&Value::Record(record)).expect("serialise");
/// assert_eq!(json, r#"{"gender":"F","children":[2]}"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// A field that was produced but carries no value.
    #[default]
    Null,
    /// A boolean flag.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A text value.
    Text(String),
    /// An ordered sequence of values.
    List(Vec<Self>),
    /// A nested record.
    Record(Record),
}

impl Value {
    /// Returns the text content if this is a [`Value::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the nested record if this is a [`Value::Record`].
    #[must_use]
    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Returns the items if this is a [`Value::List`].
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Self::Record(value)
    }
}

impl From<Vec<Self>> for Value {
    fn from(value: Vec<Self>) -> Self {
        Self::List(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(flag) => Self::Bool(flag),
            serde_json::Value::Number(number) => number
                .as_i64()
                .map_or_else(|| number.as_f64().map_or(Self::Null, Self::Float), Self::Int),
            serde_json::Value::String(text) => Self::Text(text),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Record(
                map.into_iter()
                    .map(|(key, item)| (key, Self::from(item)))
                    .collect(),
            ),
        }
    }
}
