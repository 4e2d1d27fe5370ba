//! Line-oriented parsing of the upstream event stream.
//!
//! The upstream speaks a loose SSE dialect: one JSON payload per `data:`
//! line, optionally terminated by a `[DONE]` sentinel. Upstream stream noise
//! is expected and ignored: blank lines, comments and payloads that are not
//! valid JSON never surface as errors.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use serde_json::Value;

/// Literal payload marking a deliberate end of stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Classification of one received line.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// Empty or whitespace-only.
    Blank,
    /// The `[DONE]` sentinel.
    Done,
    /// A structured payload.
    Payload(Value),
    /// Anything that failed to parse.
    Noise,
}

pub fn classify_line(raw: &str) -> Line {
    let line = raw.trim();
    if line.is_empty() {
        return Line::Blank;
    }

    let payload = line.strip_prefix("data:").map(str::trim).unwrap_or(line);
    if payload == DONE_SENTINEL {
        return Line::Done;
    }

    match serde_json::from_str(payload) {
        Ok(value) => Line::Payload(value),
        Err(_) => Line::Noise,
    }
}

/// Parse one raw line into a payload.
///
/// Returns `None` for blank lines, the sentinel and malformed payloads.
pub fn parse_line(raw: &str) -> Option<Value> {
    match classify_line(raw) {
        Line::Payload(value) => Some(value),
        Line::Blank | Line::Done | Line::Noise => None,
    }
}

/// Stream wrapper that splits a byte stream into text lines.
///
/// Splitting happens on raw bytes, so a multi-byte character cut across two
/// chunks is reassembled before decoding.
pub struct LineStream<S> {
    inner: S,
    buf: Vec<u8>,
    /// Prefix of `buf` already known to hold no newline.
    scanned: usize,
    pending: VecDeque<String>,
    finished: bool,
}

impl<S> LineStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            scanned: 0,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    fn drain_complete_lines(&mut self) {
        let mut start = 0;
        while let Some(offset) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            self.pending.push_back(decode_line(&self.buf[start..end]));
            start = end + 1;
            self.scanned = start;
        }
        if start > 0 {
            self.buf.drain(..start);
        }
        self.scanned = self.buf.len();
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

impl<S, E> Stream for LineStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<String, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        if let Some(line) = this.pending.pop_front() {
            return Poll::Ready(Some(Ok(line)));
        }

        if this.finished {
            return Poll::Ready(None);
        }

        loop {
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buf.extend_from_slice(&bytes);
                    this.drain_complete_lines();
                    if let Some(line) = this.pending.pop_front() {
                        return Poll::Ready(Some(Ok(line)));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    // Flush a final line that had no trailing newline.
                    if !this.buf.is_empty() {
                        let raw = std::mem::take(&mut this.buf);
                        return Poll::Ready(Some(Ok(decode_line(&raw))));
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => {
                    return Poll::Pending;
                }
            }
        }
    }
}

/// Split a byte stream into lines.
pub fn split_lines<S, E>(stream: S) -> LineStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    LineStream::new(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    fn bytes_stream(chunks: Vec<&'static str>) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
        futures::stream::iter(chunks.into_iter().map(|s| Ok(Bytes::from(s))))
    }

    async fn collect_lines(chunks: Vec<&'static str>) -> Vec<String> {
        split_lines(bytes_stream(chunks))
            .map(|r| r.unwrap())
            .collect()
            .await
    }

    #[test]
    fn parse_framed_payload() {
        let value = parse_line(r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#).unwrap();
        assert_eq!(value["choices"][0]["delta"]["content"], "Hi");
    }

    #[test]
    fn parse_unframed_payload() {
        let raw = r#"{"key": "value"}"#;
        assert_eq!(parse_line(raw), Some(json!({"key": "value"})));
        assert_eq!(parse_line(raw), parse_line(raw));
    }

    #[test]
    fn framing_without_space() {
        assert_eq!(parse_line("data:{\"a\":1}"), Some(json!({"a": 1})));
    }

    #[test]
    fn blank_lines_yield_nothing() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   \t"), None);
        assert_eq!(classify_line("  "), Line::Blank);
    }

    #[test]
    fn sentinel_yields_nothing() {
        assert_eq!(parse_line("[DONE]"), None);
        assert_eq!(parse_line("data: [DONE]"), None);
        assert_eq!(classify_line("data: [DONE]  "), Line::Done);
    }

    #[test]
    fn malformed_payload_is_noise() {
        assert_eq!(parse_line("data: {not json"), None);
        assert_eq!(classify_line(": keep-alive"), Line::Noise);
        assert_eq!(classify_line("event: message"), Line::Noise);
    }

    #[tokio::test]
    async fn split_simple_lines() {
        let lines = collect_lines(vec!["one\ntwo\n"]).await;
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn split_across_chunks() {
        let lines = collect_lines(vec!["data: hel", "lo wor", "ld\n\n"]).await;
        assert_eq!(lines, vec!["data: hello world", ""]);
    }

    #[tokio::test]
    async fn strips_carriage_returns() {
        let lines = collect_lines(vec!["data: hello\r\n\r\n"]).await;
        assert_eq!(lines, vec!["data: hello", ""]);
    }

    #[tokio::test]
    async fn reassembles_split_multibyte_characters() {
        // "你" is e4 bd a0.
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(&[b'd', b':', b' ', 0xe4, 0xbd])),
            Ok(Bytes::from_static(&[0xa0, b'\n'])),
        ];
        let lines: Vec<String> = split_lines(futures::stream::iter(chunks))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(lines, vec!["d: 你"]);
    }

    #[tokio::test]
    async fn long_line_over_many_chunks() {
        let mut chunks = vec!["a\nb\n"];
        chunks.extend(std::iter::repeat("x").take(5_000));
        chunks.push("\nc");
        let lines = collect_lines(chunks).await;
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "a");
        assert_eq!(lines[1], "b");
        assert_eq!(lines[2], "x".repeat(5_000));
        assert_eq!(lines[3], "c");
    }

    #[tokio::test]
    async fn flushes_unterminated_final_line() {
        let lines = collect_lines(vec!["first\nfinal"]).await;
        assert_eq!(lines, vec!["first", "final"]);
    }

    #[tokio::test]
    async fn empty_stream_has_no_lines() {
        let lines = collect_lines(vec![]).await;
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn inner_error_is_passed_through() {
        let chunks: Vec<Result<Bytes, &'static str>> =
            vec![Ok(Bytes::from_static(b"ok\n")), Err("reset")];
        let mut lines = split_lines(futures::stream::iter(chunks));

        assert_eq!(lines.next().await, Some(Ok("ok".to_string())));
        assert_eq!(lines.next().await, Some(Err("reset")));
    }
}
