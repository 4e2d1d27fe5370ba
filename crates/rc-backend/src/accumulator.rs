//! Accumulation of streamed answer and reasoning deltas.

use rc_protocol::{next_actions, text_of_field, IncrementalUpdate};
use serde_json::Value;

/// Reasoning field names, checked in order; the first non-empty one wins.
const REASONING_FIELDS: [&str; 2] = ["reasoning", "reasoning_content"];

/// Running state of one relay run.
///
/// Both buffers are append-only and `has_reasoning` never resets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Accumulator {
    answer: String,
    reasoning: String,
    has_reasoning: bool,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the delta carried by `event` (`choices[0].delta`).
    ///
    /// Returns true when the event contributed answer or reasoning text.
    /// Events without the expected shape are a no-op.
    pub fn apply(&mut self, event: &Value) -> bool {
        let Some(delta) = event
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("delta"))
        else {
            return false;
        };

        let content = text_of_field(delta.get("content"));
        let reasoning = REASONING_FIELDS
            .iter()
            .map(|field| text_of_field(delta.get(*field)))
            .find(|piece| !piece.is_empty())
            .unwrap_or_default();

        if !reasoning.is_empty() {
            self.has_reasoning = true;
            self.reasoning.push_str(&reasoning);
        }
        if !content.is_empty() {
            self.answer.push_str(&content);
        }

        !content.is_empty() || !reasoning.is_empty()
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn has_reasoning(&self) -> bool {
        self.has_reasoning
    }

    /// Current state as an `update`.
    pub fn snapshot(&self) -> IncrementalUpdate {
        IncrementalUpdate::Update {
            content: self.answer.clone(),
            reasoning: self.reasoning.clone(),
            has_reasoning: self.has_reasoning,
        }
    }

    /// Consume the state into the terminal `complete` update.
    pub fn finish(self) -> IncrementalUpdate {
        IncrementalUpdate::Complete {
            next_actions: next_actions(&self.answer),
            content: self.answer,
            reasoning: self.reasoning,
        }
    }
}
