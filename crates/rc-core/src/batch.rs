//! Non-interactive ask mode.
//!
//! Relays a single message, streams the answer to stdout as it arrives and
//! the reasoning to stderr, then prints the suggestions and exits.

use std::io::Write;
use std::pin::pin;

use futures::StreamExt;
use rc_backend::{prepare, relay, Upstream};
use rc_protocol::IncrementalUpdate;
use serde_json::Value;

use crate::widget::suggestions_markdown;

/// Writes the incremental view of one relay run.
///
/// Answer text goes to `out`, reasoning and failures to `err`. Only the
/// part of each buffer not yet printed is written.
pub struct AskOutput<O: Write, E: Write> {
    out: O,
    err: E,
    answer_printed: usize,
    reasoning_printed: usize,
}

impl<O: Write, E: Write> AskOutput<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            answer_printed: 0,
            reasoning_printed: 0,
        }
    }

    fn emit_answer(&mut self, answer: &str) {
        if let Some(fresh) = answer.get(self.answer_printed..) {
            let _ = write!(self.out, "{fresh}");
            let _ = self.out.flush();
            self.answer_printed = answer.len();
        }
    }

    fn emit_reasoning(&mut self, reasoning: &str) {
        if let Some(fresh) = reasoning.get(self.reasoning_printed..).filter(|s| !s.is_empty()) {
            if self.reasoning_printed == 0 {
                let _ = writeln!(self.err, "[rc:reasoning]");
            }
            let _ = write!(self.err, "{fresh}");
            let _ = self.err.flush();
            self.reasoning_printed = reasoning.len();
        }
    }

    /// Print one update. Returns the exit code once the run is over.
    pub fn emit(&mut self, update: &IncrementalUpdate) -> Option<i32> {
        match update {
            IncrementalUpdate::Update {
                content, reasoning, ..
            } => {
                self.emit_reasoning(reasoning);
                self.emit_answer(content);
                None
            }
            IncrementalUpdate::Complete {
                content,
                reasoning,
                next_actions,
            } => {
                self.emit_reasoning(reasoning);
                self.emit_answer(content);
                if self.reasoning_printed > 0 {
                    let _ = writeln!(self.err);
                }
                let _ = writeln!(self.out, "\n\n{}", suggestions_markdown(next_actions));
                Some(0)
            }
            IncrementalUpdate::Error { message } => {
                if self.answer_printed > 0 {
                    let _ = writeln!(self.out);
                }
                let _ = writeln!(self.err, "[rc:ask] error: {message}");
                Some(1)
            }
        }
    }

    pub fn emit_rejected(&mut self, reason: &str) -> i32 {
        let _ = writeln!(self.err, "[rc:ask] error: {reason}");
        1
    }
}

/// Run one ask. Returns the process exit code.
pub async fn run_ask<U, O, E>(upstream: U, message: &str, output: &mut AskOutput<O, E>) -> i32
where
    U: Upstream + 'static,
    O: Write,
    E: Write,
{
    let request = match prepare(&Value::String(message.to_string()), None) {
        Ok(request) => request,
        Err(e) => return output.emit_rejected(&e.to_string()),
    };

    let mut updates = pin!(relay(upstream, request));
    while let Some(update) = updates.next().await {
        if let Some(code) = output.emit(&update) {
            return code;
        }
    }
    1
}
