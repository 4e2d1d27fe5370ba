//! Chat-widget frontend.
//!
//! Maps a relay run onto a chat transcript plus two side panels (reasoning
//! and suggestions), yielding a full frame after every update so a widget
//! can simply re-render.

use std::pin::pin;

use async_stream::stream;
use futures::{Stream, StreamExt};
use rc_backend::{prepare, relay, Upstream};
use rc_protocol::{normalize_history_value, IncrementalUpdate, Message, Role};
use serde_json::Value;

/// Substring identifying the reasoning annotation.
pub const REASONING_MARKER: &str = "🧠 本次回答包含推理过程";
/// Appended once to the answer when the model also produced reasoning.
pub const REASONING_NOTE: &str = "\n\n> 🧠 本次回答包含推理过程，可在下方【思维链】中查看。";
pub const SUGGESTIONS_HEADING: &str = "### 下一步建议";

/// What the widget shows after one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub transcript: Vec<Message>,
    pub reasoning: String,
    pub suggestions: String,
}

/// Render next actions as a markdown list under a heading.
pub fn suggestions_markdown(actions: &[String]) -> String {
    let mut out = SUGGESTIONS_HEADING.to_string();
    for action in actions {
        out.push_str("\n- ");
        out.push_str(action);
    }
    out
}

/// Transcript state for one turn.
struct Turn {
    transcript: Vec<Message>,
    /// Answer text shown so far; may carry the reasoning note.
    shown: String,
    /// Length of the relay answer buffer already copied into `shown`.
    consumed: usize,
}

impl Turn {
    fn start(mut transcript: Vec<Message>, user: &str) -> Self {
        transcript.push(Message::user(user));
        transcript.push(Message::assistant(""));
        Self {
            transcript,
            shown: String::new(),
            consumed: 0,
        }
    }

    fn set_answer(&mut self, text: String) {
        match self.transcript.last_mut() {
            Some(last) if last.role == Role::Assistant => last.text = text,
            _ => self.transcript.push(Message::assistant(text)),
        }
    }

    fn apply(&mut self, update: IncrementalUpdate) -> Frame {
        match update {
            IncrementalUpdate::Update {
                content,
                reasoning,
                has_reasoning,
            } => {
                if let Some(fresh) = content.get(self.consumed..).filter(|s| !s.is_empty()) {
                    self.shown.push_str(fresh);
                    self.consumed = content.len();
                    if has_reasoning && !self.shown.contains(REASONING_MARKER) {
                        self.shown.push_str(REASONING_NOTE);
                    }
                    self.set_answer(self.shown.clone());
                }
                self.frame(reasoning, String::new())
            }
            IncrementalUpdate::Complete {
                reasoning,
                next_actions,
                ..
            } => self.frame(reasoning, suggestions_markdown(&next_actions)),
            IncrementalUpdate::Error { message } => {
                self.set_answer(message);
                self.frame(String::new(), String::new())
            }
        }
    }

    fn frame(&self, reasoning: String, suggestions: String) -> Frame {
        Frame {
            transcript: self.transcript.clone(),
            reasoning,
            suggestions,
        }
    }
}

/// Run one chat turn for the widget.
///
/// A blank message yields a single frame with the prior transcript and
/// touches nothing else. Otherwise the user message and an assistant
/// placeholder are appended and a frame follows every relay update.
pub fn chat<U>(upstream: U, message: &Value, prior: Option<&Value>) -> impl Stream<Item = Frame> + Send
where
    U: Upstream + 'static,
{
    let start = prepare(message, prior).map_err(|_| normalize_history_value(prior));

    stream! {
        let request = match start {
            Ok(request) => request,
            Err(transcript) => {
                yield Frame { transcript, ..Frame::default() };
                return;
            }
        };

        let mut turn = Turn::start(request.messages.clone(), &request.user);
        let mut updates = pin!(relay(upstream, request));
        while let Some(update) = updates.next().await {
            yield turn.apply(update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_backend::mock::{fixtures, MockConfig, MockUpstream};
    use rc_protocol::NEXT_ACTIONS;
    use serde_json::json;

    async fn run(config: MockConfig, message: Value, prior: Value) -> (MockUpstream, Vec<Frame>) {
        let upstream = MockUpstream::new(config);
        let frames = chat(upstream.clone(), &message, Some(&prior)).collect().await;
        (upstream, frames)
    }

    fn last_text(frame: &Frame) -> &str {
        &frame.transcript.last().unwrap().text
    }

    #[test]
    fn suggestions_render_as_list() {
        let actions: Vec<String> = vec!["a".to_string(), "b".to_string()];
        assert_eq!(suggestions_markdown(&actions), "### 下一步建议\n- a\n- b");
    }

    #[tokio::test]
    async fn blank_message_returns_prior_transcript() {
        let (upstream, frames) = run(
            fixtures::streaming_text(&["unused"]),
            json!("   "),
            json!([["q", "a"]]),
        )
        .await;
        assert_eq!(
            frames,
            vec![Frame {
                transcript: vec![Message::user("q"), Message::assistant("a")],
                ..Frame::default()
            }]
        );
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn answer_fills_assistant_placeholder() {
        let (_, frames) = run(
            fixtures::streaming_text(&["Hi", " there"]),
            json!("hello"),
            json!([]),
        )
        .await;
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].transcript[0], Message::user("hello"));
        assert_eq!(last_text(&frames[0]), "Hi");
        assert_eq!(last_text(&frames[1]), "Hi there");
        assert!(frames[1].suggestions.is_empty());

        let done = &frames[2];
        assert_eq!(last_text(done), "Hi there");
        for action in NEXT_ACTIONS {
            assert!(done.suggestions.contains(action));
        }
    }

    #[tokio::test]
    async fn prior_history_precedes_new_turn() {
        let (upstream, frames) = run(
            fixtures::streaming_text(&["ok"]),
            json!("next"),
            json!([{"role": "user", "content": "first"}, {"role": "assistant", "content": "reply"}]),
        )
        .await;
        let transcript = &frames.last().unwrap().transcript;
        assert_eq!(
            transcript,
            &vec![
                Message::user("first"),
                Message::assistant("reply"),
                Message::user("next"),
                Message::assistant("ok"),
            ]
        );
        assert_eq!(upstream.requests()[0].messages.len(), 2);
    }

    #[tokio::test]
    async fn reasoning_note_is_added_once() {
        let (_, frames) = run(
            fixtures::reasoning_then_text(&["let me", " think"], &["A", "B"]),
            json!("why"),
            json!([]),
        )
        .await;

        // Reasoning-only updates leave the answer empty.
        assert_eq!(last_text(&frames[0]), "");
        assert_eq!(frames[1].reasoning, "let me think");

        assert_eq!(last_text(&frames[2]), format!("A{REASONING_NOTE}"));
        assert_eq!(last_text(&frames[3]), format!("A{REASONING_NOTE}B"));
        assert_eq!(last_text(&frames[3]).matches(REASONING_MARKER).count(), 1);

        let done = frames.last().unwrap();
        assert_eq!(done.reasoning, "let me think");
        assert!(done.suggestions.starts_with(SUGGESTIONS_HEADING));
    }

    #[tokio::test]
    async fn error_replaces_answer_and_clears_panels() {
        let (_, frames) = run(
            fixtures::error_mid_stream("partial", "reset"),
            json!("hello"),
            json!([]),
        )
        .await;
        let last = frames.last().unwrap();
        assert_eq!(last_text(last), "请求失败: reset");
        assert!(last.reasoning.is_empty());
        assert!(last.suggestions.is_empty());
        assert_eq!(last.transcript.len(), 2);
    }

    #[tokio::test]
    async fn refused_upstream_yields_single_error_frame() {
        let (_, frames) = run(
            fixtures::refused("connection refused"),
            json!("hello"),
            json!(null),
        )
        .await;
        assert_eq!(frames.len(), 1);
        assert!(last_text(&frames[0]).starts_with("请求失败"));
    }
}
