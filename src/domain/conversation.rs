//! Conversation and agent records as read from the store

use serde::{Deserialize, Serialize};

/// A conversation row, read once at the start of an orchestration run and
/// immutable for its duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// The agent that drives the conversation
    pub main_agent_id: Option<i64>,
    /// Model name forwarded to the chat tool
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i64>,
}

/// A registered agent. The endpoint is the MCP server URL the agent is
/// reachable at; agents without one cannot participate in a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: i64,
    pub name: String,
    pub endpoint: Option<String>,
}
