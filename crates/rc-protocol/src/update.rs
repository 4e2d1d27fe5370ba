//! Incremental updates emitted by a relay run.

use serde::{Deserialize, Serialize};

/// Follow-up prompts offered after every completed answer.
pub const NEXT_ACTIONS: [&str; 3] = [
    "是否需要把当前结论转化为一个 POC 验证方案？",
    "是否需要进一步量化成本或风险？",
    "是否要整理为一页决策备忘录？",
];

/// Suggestions attached to a completed answer. Currently static.
pub fn next_actions(_answer: &str) -> Vec<String> {
    NEXT_ACTIONS.iter().map(|s| (*s).to_string()).collect()
}

/// One step of a relay run.
///
/// A run produces any number of `Update`s followed by exactly one
/// `Complete` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IncrementalUpdate {
    Update {
        content: String,
        reasoning: String,
        has_reasoning: bool,
    },
    Complete {
        content: String,
        reasoning: String,
        next_actions: Vec<String>,
    },
    Error {
        #[serde(rename = "error")]
        message: String,
    },
}

impl IncrementalUpdate {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IncrementalUpdate::Update { .. })
    }
}
