//! Upstream chat-completion endpoint client.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use rc_protocol::Message;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use serde::Serialize;

use crate::error::RelayError;

pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:11211/api/v1/chat/context";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const EVENT_STREAM: &str = "text/event-stream";
/// Most characters of an error response body kept for the failure text.
const ERROR_BODY_LIMIT: usize = 200;

/// Payload sent upstream for one relay run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamRequest {
    pub user: String,
    pub stream: bool,
    pub messages: Vec<Message>,
}

impl UpstreamRequest {
    pub fn new(user: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            user: user.into(),
            stream: true,
            messages,
        }
    }
}

/// Raw response body of an opened upstream stream.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RelayError>> + Send>>;

/// Something that can open a streaming chat request.
///
/// Dropping the returned stream releases the underlying connection.
pub trait Upstream: Send + Sync {
    fn open(
        &self,
        request: &UpstreamRequest,
    ) -> impl Future<Output = Result<ByteStream, RelayError>> + Send;
}

/// HTTP client for the upstream endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    url: String,
    http: Client,
}

impl UpstreamClient {
    /// Create a client for `url`. `timeout` bounds both connecting and the
    /// whole streamed response.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RelayError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Upstream for UpstreamClient {
    async fn open(&self, request: &UpstreamRequest) -> Result<ByteStream, RelayError> {
        let response = self
            .http
            .post(&self.url)
            .header(ACCEPT, EVENT_STREAM)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = error_excerpt(response).await;
            return Err(RelayError::Status { status, body });
        }

        Ok(Box::pin(
            response.bytes_stream().map(|chunk| chunk.map_err(RelayError::from)),
        ))
    }
}

/// Read at most `ERROR_BODY_LIMIT` characters of an error body, stopping
/// at the first chunk past the limit. Whitespace runs collapse to one space.
async fn error_excerpt(mut response: Response) -> String {
    let mut raw = Vec::new();
    while raw.len() < ERROR_BODY_LIMIT * 4 {
        match response.chunk().await {
            Ok(Some(chunk)) => raw.extend_from_slice(&chunk),
            _ => break,
        }
    }
    String::from_utf8_lossy(&raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(ERROR_BODY_LIMIT)
        .collect()
}
