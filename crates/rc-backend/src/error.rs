use reqwest::StatusCode;
use thiserror::Error;

/// Prefix of every user-visible failure text.
pub const REQUEST_FAILED: &str = "请求失败";

#[derive(Debug, Error)]
pub enum RelayError {
    /// The user message was blank after coercion and trimming.
    #[error("Message is empty")]
    EmptyMessage,
    /// Connection, timeout or body read failure reported by the HTTP client.
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    /// The upstream answered with a non-success status.
    #[error("{status}: {body}")]
    Status { status: StatusCode, body: String },
    /// Any other transport failure while streaming.
    #[error("{0}")]
    Stream(String),
}

impl RelayError {
    /// Short text shown to users in place of an answer.
    pub fn user_message(&self) -> String {
        format!("{REQUEST_FAILED}: {self}")
    }
}
