//! Mock upstream for testing.
//!
//! Produces raw byte streams the same way the real HTTP upstream does, so
//! the relay and both frontends can be tested without a server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_stream::stream;
use bytes::Bytes;
use serde_json::json;
use tokio::time::sleep;

use crate::error::RelayError;
use crate::upstream::{ByteStream, Upstream, UpstreamRequest};

/// Configurable mock responses for testing.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Emit one line; a trailing newline is added.
    Line { content: String },
    /// Emit raw bytes as one chunk, with no line handling.
    Chunk { bytes: Vec<u8> },
    /// Fail the body stream at this point.
    Error { message: String },
    /// Delay before next response (for timing tests).
    Delay { ms: u64 },
}

/// Configuration for mock upstream.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Sequence of responses to emit.
    pub responses: Vec<MockResponse>,
    /// Optional delay between each response (ms).
    pub chunk_delay_ms: Option<u64>,
    /// When set, opening the stream fails with this message.
    pub refuse: Option<String>,
}

impl MockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(mut self, responses: Vec<MockResponse>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_chunk_delay(mut self, ms: u64) -> Self {
        self.chunk_delay_ms = Some(ms);
        self
    }

    pub fn refusing(mut self, message: impl Into<String>) -> Self {
        self.refuse = Some(message.into());
        self
    }
}

/// Scripted upstream. Clones share the request log.
#[derive(Debug, Clone, Default)]
pub struct MockUpstream {
    config: MockConfig,
    requests: Arc<Mutex<Vec<UpstreamRequest>>>,
}

impl MockUpstream {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            requests: Arc::default(),
        }
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

impl Upstream for MockUpstream {
    async fn open(&self, request: &UpstreamRequest) -> Result<ByteStream, RelayError> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }

        if let Some(message) = &self.config.refuse {
            return Err(RelayError::Stream(message.clone()));
        }

        let config = self.config.clone();
        Ok(Box::pin(stream! {
            for response in config.responses {
                if let Some(delay_ms) = config.chunk_delay_ms {
                    sleep(Duration::from_millis(delay_ms)).await;
                }

                match response {
                    MockResponse::Line { content } => {
                        yield Ok(Bytes::from(format!("{content}\n")));
                    }
                    MockResponse::Chunk { bytes } => {
                        yield Ok(Bytes::from(bytes));
                    }
                    MockResponse::Error { message } => {
                        yield Err(RelayError::Stream(message));
                        return;
                    }
                    MockResponse::Delay { ms } => {
                        sleep(Duration::from_millis(ms)).await;
                    }
                }
            }
        }))
    }
}

/// `data:` line carrying a single delta field.
pub fn delta_line(field: &str, text: &str) -> String {
    let mut delta = serde_json::Map::new();
    delta.insert(field.to_string(), json!(text));
    format!("data: {}", json!({"choices": [{"delta": delta}]}))
}

/// Built-in test fixtures for common scenarios.
pub mod fixtures {
    use super::*;

    fn line(content: impl Into<String>) -> MockResponse {
        MockResponse::Line {
            content: content.into(),
        }
    }

    /// Answer text streamed in chunks, then the connection closes.
    pub fn streaming_text(chunks: &[&str]) -> MockConfig {
        let responses = chunks
            .iter()
            .map(|chunk| line(delta_line("content", chunk)))
            .collect();
        MockConfig::new().with_responses(responses)
    }

    /// Answer text followed by the `[DONE]` sentinel.
    pub fn text_then_done(chunks: &[&str]) -> MockConfig {
        let mut config = streaming_text(chunks);
        config.responses.push(line("data: [DONE]"));
        config
    }

    /// Reasoning deltas first, then answer deltas.
    pub fn reasoning_then_text(reasoning: &[&str], text: &[&str]) -> MockConfig {
        let responses = reasoning
            .iter()
            .map(|piece| line(delta_line("reasoning", piece)))
            .chain(text.iter().map(|chunk| line(delta_line("content", chunk))))
            .collect();
        MockConfig::new().with_responses(responses)
    }

    /// Some answer text, then a transport failure.
    pub fn error_mid_stream(text_before: &str, error: &str) -> MockConfig {
        MockConfig::new().with_responses(vec![
            line(delta_line("content", text_before)),
            MockResponse::Error {
                message: error.to_string(),
            },
        ])
    }

    /// The connection cannot be established.
    pub fn refused(message: &str) -> MockConfig {
        MockConfig::new().refusing(message)
    }
}
