//! The relay run: one upstream request turned into incremental updates.

use async_stream::stream;
use futures::{Stream, StreamExt};
use rc_protocol::{normalize_history_value, text_of, IncrementalUpdate};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::accumulator::Accumulator;
use crate::error::RelayError;
use crate::sse::{classify_line, split_lines, Line};
use crate::upstream::{Upstream, UpstreamRequest};

/// Validate the user message and build the upstream payload.
///
/// Fails with [`RelayError::EmptyMessage`] before any network activity when
/// the message is blank after coercion and trimming.
pub fn prepare(message: &Value, history: Option<&Value>) -> Result<UpstreamRequest, RelayError> {
    let user = text_of(message).trim().to_string();
    if user.is_empty() {
        return Err(RelayError::EmptyMessage);
    }
    Ok(UpstreamRequest::new(user, normalize_history_value(history)))
}

/// Run one relay: open the upstream stream and yield updates as deltas
/// arrive.
///
/// The stream yields zero or more `Update`s and always ends with exactly one
/// `Complete` or `Error`. Dropping it early releases the upstream
/// connection.
pub fn relay<U>(upstream: U, request: UpstreamRequest) -> impl Stream<Item = IncrementalUpdate> + Send
where
    U: Upstream + 'static,
{
    stream! {
        info!(history = request.messages.len(), "relay started");

        let body = match upstream.open(&request).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "upstream request failed");
                yield IncrementalUpdate::Error { message: e.user_message() };
                return;
            }
        };

        let mut lines = split_lines(body);
        let mut acc = Accumulator::new();

        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "upstream stream failed");
                    yield IncrementalUpdate::Error { message: e.user_message() };
                    return;
                }
            };

            match classify_line(&line) {
                Line::Payload(event) => {
                    if acc.apply(&event) {
                        yield acc.snapshot();
                    }
                }
                Line::Done => break,
                Line::Noise => debug!(line = %line, "ignoring malformed upstream line"),
                Line::Blank => {}
            }
        }

        info!(
            answer_len = acc.answer().len(),
            reasoning_len = acc.reasoning().len(),
            "relay completed"
        );
        yield acc.finish();
    }
}
