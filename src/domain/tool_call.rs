//! Tool-call request/result types and the aggregated tool catalog

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool-call request emitted by the main agent.
///
/// `arguments` is the raw string payload exactly as the agent produced it;
/// it is parsed as JSON only at dispatch time so a malformed payload can be
/// reported back with the original text intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Correlation key echoed by the matching tool result
    pub id: String,
    /// Sanitized (catalog) tool name
    pub name: String,
    /// Raw argument payload (string-encoded JSON)
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Synthesize a correlation id when the agent did not provide one
    pub fn generate_id() -> String {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        format!("call_{}", &hex[..24])
    }
}

/// Outcome of dispatching one tool-call request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Echoes the request id
    pub id: String,
    /// Display name of the agent that owned the tool (for audit)
    pub agent_name: String,
    /// Original (un-sanitized) tool name
    pub tool_name: String,
    /// Result text, or a description of the failure
    pub content: String,
    /// Whether the dispatch failed
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn success(
        id: impl Into<String>,
        agent_name: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            agent_name: agent_name.into(),
            tool_name: tool_name.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn failure(
        id: impl Into<String>,
        agent_name: impl Into<String>,
        tool_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            agent_name: agent_name.into(),
            tool_name: tool_name.into(),
            content: format!("Error: {}", error.into()),
            is_error: true,
        }
    }
}

/// One entry in the aggregated tool catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogTool {
    /// Globally unique catalog name (≤ 64 chars)
    pub sanitized_name: String,
    /// Name the owning agent knows the tool by
    pub original_name: String,
    /// Owning agent id
    pub agent_id: i64,
    /// Owning agent display name
    pub agent_name: String,
    /// Tool description for the main agent
    pub description: Option<String>,
    /// JSON Schema for the tool's parameters
    pub parameters: Value,
}

/// Endpoint + display name for one linked agent, used at dispatch time.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub agent_id: i64,
    pub agent_name: String,
    pub endpoint: String,
}

/// Discovery outcome for one linked agent. Partial success across agents is
/// the normal case, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct AgentDiagnostic {
    pub agent_id: i64,
    pub agent_name: String,
    pub tool_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
