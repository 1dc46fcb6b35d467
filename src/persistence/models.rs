//! Database models for the persistence layer

use crate::domain::Message;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Message kind discriminator stored beside the role.
pub mod kind {
    /// Plain conversational text
    pub const TEXT: &str = "text";
    /// Assistant turn that requested tool calls
    pub const TOOL_CALL: &str = "tool_call";
    /// Result of a dispatched tool call
    pub const TOOL_RESULT: &str = "tool_result";
}

/// One persisted message row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Insertion sequence within the conversation
    pub seq: i64,
    /// Message role as stored (may be corrupt for old rows)
    pub role: String,
    /// Message text
    pub content: String,
    /// Kind discriminator, see [`kind`]
    pub kind: String,
    /// Structured metadata: toolCallId, name, toolCalls
    pub metadata: Option<Value>,
}

impl StoredMessage {
    /// Flatten an in-memory message into its row shape.
    pub fn from_message(seq: i64, message: &Message) -> Self {
        let mut metadata = serde_json::Map::new();
        if let Some(id) = &message.tool_call_id {
            metadata.insert("toolCallId".to_string(), json!(id));
        }
        if let Some(name) = &message.name {
            metadata.insert("name".to_string(), json!(name));
        }
        if let Some(calls) = &message.tool_calls {
            metadata.insert(
                "toolCalls".to_string(),
                serde_json::to_value(calls).unwrap_or(Value::Null),
            );
        }

        let kind = if message.tool_calls.is_some() {
            kind::TOOL_CALL
        } else if message.tool_call_id.is_some() {
            kind::TOOL_RESULT
        } else {
            kind::TEXT
        };

        Self {
            seq,
            role: message.role.to_string(),
            content: message.content.clone(),
            kind: kind.to_string(),
            metadata: if metadata.is_empty() {
                None
            } else {
                Some(Value::Object(metadata))
            },
        }
    }
}
