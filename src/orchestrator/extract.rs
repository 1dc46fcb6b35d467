//! Reply extraction
//!
//! A main agent's chat tool answers over MCP content parts, and different
//! agent implementations smuggle tool-call requests out in different shapes.
//! Extraction walks an ordered strategy list and stops at the first one that
//! yields calls:
//!
//! 1. A `toolCalls` / `tool_calls` array in the reply metadata, in either the
//!    flat `{id, name, arguments}` form or the nested
//!    `{id, function: {name, arguments}}` form.
//! 2. A text content part whose body parses as a JSON object carrying a
//!    `tool_calls` array, or a bare `{name, arguments}` object.
//!
//! Content parts consumed as tool calls are excluded from the reply text.
//! Arguments are kept as the raw JSON string; the dispatcher parses them at
//! call time so a malformed payload fails one call, not the turn.

use crate::adapters::mcp_client::ToolReply;
use crate::domain::ToolCallRequest;
use serde_json::Value;
use tracing::debug;

/// Split a chat reply into assistant text and any requested tool calls.
pub fn extract_reply(reply: &ToolReply) -> (String, Vec<ToolCallRequest>) {
    if let Some(calls) = extract_from_metadata(reply.metadata.as_ref()) {
        if !calls.is_empty() {
            debug!(count = calls.len(), "extracted tool calls from metadata");
            return (reply.text(), calls);
        }
    }

    // Fallback: scan text parts for embedded JSON tool calls.
    let mut text_parts: Vec<&str> = Vec::new();
    let mut calls: Vec<ToolCallRequest> = Vec::new();

    for part in &reply.content {
        if part.part_type != "text" {
            continue;
        }
        let Some(text) = part.text.as_deref() else {
            continue;
        };

        match parse_embedded_calls(text) {
            Some(embedded) if !embedded.is_empty() => calls.extend(embedded),
            _ => text_parts.push(text),
        }
    }

    if !calls.is_empty() {
        debug!(count = calls.len(), "extracted tool calls embedded in content");
    }

    (text_parts.concat(), calls)
}

fn extract_from_metadata(metadata: Option<&Value>) -> Option<Vec<ToolCallRequest>> {
    let metadata = metadata?;
    let array = metadata
        .get("toolCalls")
        .or_else(|| metadata.get("tool_calls"))?
        .as_array()?;

    let calls = array.iter().filter_map(parse_call_value).collect();
    Some(calls)
}

/// Parse one tool-call value in either the flat or the nested encoding.
fn parse_call_value(value: &Value) -> Option<ToolCallRequest> {
    let obj = value.as_object()?;

    let (name, arguments) = if let Some(function) = obj.get("function").and_then(Value::as_object) {
        (function.get("name"), function.get("arguments"))
    } else {
        (obj.get("name"), obj.get("arguments"))
    };

    let name = name.and_then(Value::as_str)?.trim();
    if name.is_empty() {
        return None;
    }

    let arguments = match arguments {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "{}".to_string(),
    };

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(ToolCallRequest::generate_id);

    Some(ToolCallRequest {
        id,
        name: name.to_string(),
        arguments,
    })
}

/// Try to read a text part as an embedded tool-call payload.
fn parse_embedded_calls(text: &str) -> Option<Vec<ToolCallRequest>> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    let obj = value.as_object()?;

    if let Some(array) = obj
        .get("tool_calls")
        .or_else(|| obj.get("toolCalls"))
        .and_then(Value::as_array)
    {
        return Some(array.iter().filter_map(parse_call_value).collect());
    }

    // A bare single-call object.
    if obj.contains_key("name") && obj.contains_key("arguments") {
        return parse_call_value(&value).map(|call| vec![call]);
    }

    None
}
