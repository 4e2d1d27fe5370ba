//! Content coercion for loosely shaped message payloads.
//!
//! Callers and upstream models send content as plain strings, objects with a
//! `content` or `text` field, lists mixing both, or null. [`Content`] decodes
//! that shape once so everything downstream only deals with flat text.

use serde_json::Value;

/// A content value decoded from arbitrary JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Null or absent.
    Empty,
    /// A plain string.
    Text(String),
    /// An object; holds the text found under `content`, else `text`.
    Keyed(String),
    /// A list whose items are decoded recursively.
    Sequence(Vec<Content>),
    /// Numbers and booleans, kept in their JSON form.
    Other(String),
}

impl Content {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Content::Empty,
            Value::String(s) => Content::Text(s.clone()),
            Value::Object(map) => {
                let picked = ["content", "text"]
                    .iter()
                    .filter_map(|key| map.get(*key))
                    .find(|v| is_truthy(v));
                Content::Keyed(picked.map(scalar_text).unwrap_or_default())
            }
            Value::Array(items) => Content::Sequence(items.iter().map(Content::from_value).collect()),
            other => Content::Other(other.to_string()),
        }
    }

    /// Flatten to text. Sequences concatenate in order.
    pub fn text(&self) -> String {
        match self {
            Content::Empty => String::new(),
            Content::Text(s) | Content::Keyed(s) | Content::Other(s) => s.clone(),
            Content::Sequence(items) => items.iter().map(Content::text).collect(),
        }
    }
}

impl From<&Value> for Content {
    fn from(value: &Value) -> Self {
        Content::from_value(value)
    }
}

/// Flatten any JSON content shape into text. Never fails.
pub fn text_of(value: &Value) -> String {
    Content::from_value(value).text()
}

/// Same as [`text_of`], with a missing field treated as null.
pub fn text_of_field(value: Option<&Value>) -> String {
    value.map(text_of).unwrap_or_default()
}

/// Keyed fields are coerced, not recursed into: a nested object or list
/// becomes its JSON text.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Falsy values (null, false, 0, empty string/list/object) are skipped when
/// choosing between the `content` and `text` keys.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
