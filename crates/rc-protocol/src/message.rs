//! Conversation messages and history normalization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::{text_of, text_of_field};

/// Role in a conversation.
///
/// Roles other than user and assistant (e.g. `system`) are carried through
/// verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    #[serde(untagged)]
    Other(String),
}

impl Role {
    pub fn parse(s: &str) -> Self {
        match s {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            other => Role::Other(other.to_string()),
        }
    }
}

/// A message in the conversation history.
///
/// Serialized as `{role, content}`, the shape the upstream expects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    #[serde(rename = "content")]
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Convert heterogeneous history entries into an ordered message list.
///
/// Accepted shapes:
/// - `{"role": "...", "content": ...}` records, role required and kept as given;
/// - `[user, assistant]` pairs, each side emitted only when non-empty.
///
/// Anything else is skipped. Whitespace-only text is kept as is.
pub fn normalize_history(raw: &[Value]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(raw.len());

    for item in raw {
        match item {
            Value::Object(record) => {
                let Some(role) = record
                    .get("role")
                    .and_then(Value::as_str)
                    .filter(|r| !r.is_empty())
                    .map(Role::parse)
                else {
                    continue;
                };
                messages.push(Message {
                    role,
                    text: text_of_field(record.get("content")),
                });
            }
            Value::Array(pair) if pair.len() == 2 => {
                let user = text_of(&pair[0]);
                if !user.is_empty() {
                    messages.push(Message::user(user));
                }
                let assistant = text_of(&pair[1]);
                if !assistant.is_empty() {
                    messages.push(Message::assistant(assistant));
                }
            }
            _ => {}
        }
    }

    messages
}

/// Normalize a history value that may be null or not a list at all.
pub fn normalize_history_value(raw: Option<&Value>) -> Vec<Message> {
    match raw {
        Some(Value::Array(items)) => normalize_history(items),
        _ => Vec::new(),
    }
}
