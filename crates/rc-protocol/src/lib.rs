//! rc-protocol: Shared types for relaychat.
//!
//! Defines the content and message shapes used between the HTTP and widget
//! frontends and the upstream relay, plus the incremental updates a relay
//! run produces.

pub mod content;
pub mod message;
pub mod update;

pub use content::{text_of, text_of_field, Content};
pub use message::{normalize_history, normalize_history_value, Message, Role};
pub use update::{next_actions, IncrementalUpdate, NEXT_ACTIONS};
