//! rc-core: Frontends and application wiring for relaychat.
//!
//! Hosts the HTTP/SSE API, the chat-widget adapter and the one-shot ask
//! mode on top of the relay in `rc-backend`. Exposed as a library for
//! integration testing.

pub mod batch;
pub mod config;
pub mod http;
pub mod widget;
