//! Domain types
//!
//! Core abstractions shared by the orchestrator, adapters and persistence:
//! conversations, messages and tool-call types.

mod conversation;
mod message;
mod tool_call;

pub use conversation::*;
pub use message::*;
pub use tool_call::*;
