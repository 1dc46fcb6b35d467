//! History reconstruction
//!
//! Rehydrates persisted rows into in-memory messages before a run starts.
//! Tool-call linkage lives in the row metadata (`toolCallId`, `name`,
//! `toolCalls`); a corrupt row is skipped with a warning rather than
//! aborting the load, and a stored tool row whose `toolCallId` was lost
//! gets a deterministic synthetic id so downstream linkage still holds.

use crate::domain::{Message, Role, ToolCallRequest};
use crate::persistence::StoredMessage;
use serde_json::Value;
use std::str::FromStr;
use tracing::warn;

/// Rebuild the message buffer for a conversation from its stored rows.
pub fn reconstruct(conversation_id: i64, rows: &[StoredMessage]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        match rehydrate_row(conversation_id, index, row) {
            Some(message) => messages.push(message),
            None => {
                warn!(
                    conversation_id,
                    seq = row.seq,
                    role = %row.role,
                    "skipping history row that does not normalize"
                );
            }
        }
    }

    messages
}

fn rehydrate_row(conversation_id: i64, index: usize, row: &StoredMessage) -> Option<Message> {
    let role = Role::from_str(&row.role).ok()?;

    // The chat tool rejects empty content on any turn, same rule the
    // normalizer enforces at the boundary.
    if row.content.is_empty() {
        return None;
    }

    let metadata = row.metadata.as_ref();
    let name = metadata
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string);

    match role {
        Role::Tool => {
            let tool_call_id = metadata
                .and_then(|m| m.get("toolCallId"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| {
                    warn!(
                        conversation_id,
                        seq = row.seq,
                        "stored tool message lacks a toolCallId, synthesizing"
                    );
                    format!("call_{conversation_id}_{index}")
                });

            let mut message = Message::tool_result(
                tool_call_id,
                name.unwrap_or_default(),
                row.content.clone(),
            );
            if message.name.as_deref() == Some("") {
                message.name = None;
            }
            Some(message)
        }
        Role::Assistant => {
            let tool_calls = metadata
                .and_then(|m| m.get("toolCalls"))
                .and_then(|calls| {
                    serde_json::from_value::<Vec<ToolCallRequest>>(calls.clone()).ok()
                })
                .filter(|calls| !calls.is_empty());

            let message = match tool_calls {
                Some(calls) => Message::assistant_with_tools(row.content.clone(), calls),
                None => Message::assistant(row.content.clone()),
            };
            Some(Message { name, ..message })
        }
        Role::System | Role::User => Some(Message {
            role,
            content: row.content.clone(),
            name,
            tool_call_id: None,
            tool_calls: None,
        }),
    }
}
