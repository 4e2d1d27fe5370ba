//! rc-backend: Upstream relay for relaychat.
//!
//! Opens a streaming request against the chat-completion endpoint, parses
//! the event stream line by line, and accumulates answer and reasoning
//! deltas into incremental updates.

pub mod accumulator;
pub mod error;
pub mod mock;
pub mod relay;
pub mod sse;
pub mod upstream;

pub use accumulator::Accumulator;
pub use error::{RelayError, REQUEST_FAILED};
pub use mock::{MockConfig, MockResponse, MockUpstream};
pub use relay::{prepare, relay};
pub use sse::parse_line;
pub use upstream::{
    ByteStream, Upstream, UpstreamClient, UpstreamRequest, DEFAULT_TIMEOUT, DEFAULT_UPSTREAM_URL,
};
