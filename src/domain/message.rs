//! Conversation message types and normalization

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::tool_call::ToolCallRequest;

/// Substituted for empty assistant text when the turn carries tool calls,
/// since the chat tool rejects empty content on any turn.
pub const TOOL_CALL_PLACEHOLDER: &str = "(requesting tool calls)";

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message (instructions to the model)
    System,
    /// User message
    User,
    /// Assistant (model) message
    Assistant,
    /// Tool result message
    Tool,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "tool" => Ok(Role::Tool),
            _ => Err(()),
        }
    }
}

/// A validated message in an orchestration run.
///
/// Serializes in the wire form the chat tool expects (camelCase optionals).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Message content (always non-empty after normalization)
    pub content: String,
    /// Optional name for the message sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// ID of the tool call this message is responding to (role = tool only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool calls requested by the assistant (role = assistant only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: None,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: None,
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: None,
        }
    }

    /// Create an assistant message carrying tool-call requests.
    ///
    /// Empty text is replaced by a placeholder so the buffer never contains
    /// an empty assistant turn.
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        let content = content.into();
        let content = if content.trim().is_empty() && !tool_calls.is_empty() {
            TOOL_CALL_PLACEHOLDER.to_string()
        } else {
            content
        };

        Self {
            role: Role::Assistant,
            content,
            name: None,
            tool_call_id: None,
            tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
        }
    }

    /// Create a tool result message correlated to a tool-call id
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            name: Some(name.into()),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }
}

/// Raw inbound message shape, before normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<IncomingToolCall>>,
}

/// Raw inbound tool-call entry attached to an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingToolCall {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// Validation failure, reported with the path of the offending field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path} {message}")]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Validate and canonicalize a raw message. Pure; never drops a message
/// silently; malformed input is rejected with the offending field path.
pub fn normalize_message(raw: &IncomingMessage, path: &str) -> Result<Message, ValidationError> {
    let role = Role::from_str(raw.role.as_str()).map_err(|_| {
        ValidationError::new(
            format!("{path}.role"),
            "must be one of system, user, assistant, tool",
        )
    })?;

    if raw.content.is_empty() {
        return Err(ValidationError::new(
            format!("{path}.content"),
            "must be a non-empty string",
        ));
    }

    let name = match &raw.name {
        Some(name) if name.trim().is_empty() => {
            return Err(ValidationError::new(
                format!("{path}.name"),
                "must be a non-empty string when provided",
            ));
        }
        Some(name) => Some(name.trim().to_string()),
        None => None,
    };

    let tool_call_id = match &raw.tool_call_id {
        Some(id) if id.trim().is_empty() => {
            return Err(ValidationError::new(
                format!("{path}.toolCallId"),
                "must be a non-empty string when provided",
            ));
        }
        Some(id) => Some(id.trim().to_string()),
        None if role == Role::Tool => {
            return Err(ValidationError::new(
                format!("{path}.toolCallId"),
                "is required when role is \"tool\"",
            ));
        }
        None => None,
    };

    let tool_calls = match &raw.tool_calls {
        Some(_) if role != Role::Assistant => {
            return Err(ValidationError::new(
                format!("{path}.toolCalls"),
                "is only allowed when role is \"assistant\"",
            ));
        }
        Some(calls) => {
            let mut normalized = Vec::with_capacity(calls.len());
            for (index, call) in calls.iter().enumerate() {
                if call.name.trim().is_empty() {
                    return Err(ValidationError::new(
                        format!("{path}.toolCalls[{index}].name"),
                        "must be a non-empty string",
                    ));
                }
                if call.arguments.is_empty() {
                    return Err(ValidationError::new(
                        format!("{path}.toolCalls[{index}].arguments"),
                        "must be a non-empty string",
                    ));
                }
                normalized.push(ToolCallRequest {
                    id: call
                        .id
                        .clone()
                        .filter(|id| !id.trim().is_empty())
                        .unwrap_or_else(ToolCallRequest::generate_id),
                    name: call.name.trim().to_string(),
                    arguments: call.arguments.clone(),
                });
            }
            if normalized.is_empty() { None } else { Some(normalized) }
        }
        None => None,
    };

    Ok(Message {
        role,
        content: raw.content.clone(),
        name,
        tool_call_id,
        tool_calls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(role: &str, content: &str) -> IncomingMessage {
        IncomingMessage {
            role: role.to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn normalizes_plain_user_message() {
        let message = normalize_message(&raw("user", "hello"), "messages[0]").unwrap();
        assert_eq!(message.role, Role::User);
        assert_eq!(message.content, "hello");
        assert!(message.tool_calls.is_none());
    }

    #[test]
    fn rejects_unknown_role_with_field_path() {
        let err = normalize_message(&raw("narrator", "hi"), "messages[3]").unwrap_err();
        assert_eq!(err.path, "messages[3].role");
    }

    #[test]
    fn rejects_empty_content() {
        let err = normalize_message(&raw("user", ""), "messages[0]").unwrap_err();
        assert_eq!(err.path, "messages[0].content");
    }

    #[test]
    fn tool_role_requires_tool_call_id() {
        let err = normalize_message(&raw("tool", "ok"), "messages[1]").unwrap_err();
        assert_eq!(err.path, "messages[1].toolCallId");

        let mut message = raw("tool", "ok");
        message.tool_call_id = Some("call_1".to_string());
        let normalized = normalize_message(&message, "messages[1]").unwrap();
        assert_eq!(normalized.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn tool_calls_only_allowed_on_assistant() {
        let mut message = raw("user", "hello");
        message.tool_calls = Some(vec![IncomingToolCall {
            id: None,
            name: "lookup".to_string(),
            arguments: "{}".to_string(),
        }]);
        let err = normalize_message(&message, "messages[0]").unwrap_err();
        assert_eq!(err.path, "messages[0].toolCalls");
    }

    #[test]
    fn synthesizes_tool_call_id_when_absent() {
        let mut message = raw("assistant", "checking");
        message.tool_calls = Some(vec![IncomingToolCall {
            id: None,
            name: "lookup".to_string(),
            arguments: "{}".to_string(),
        }]);
        let normalized = normalize_message(&message, "messages[0]").unwrap();
        let calls = normalized.tool_calls.unwrap();
        assert!(calls[0].id.starts_with("call_"));
    }

    #[test]
    fn empty_assistant_text_with_calls_gets_placeholder() {
        let call = ToolCallRequest {
            id: "call_1".to_string(),
            name: "lookup".to_string(),
            arguments: "{}".to_string(),
        };
        let message = Message::assistant_with_tools("", vec![call]);
        assert_eq!(message.content, TOOL_CALL_PLACEHOLDER);
    }
}
