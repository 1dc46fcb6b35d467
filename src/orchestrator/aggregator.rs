//! Tool Aggregator
//!
//! Builds the namespaced tool catalog offered to the main agent. Every linked
//! agent is queried in parallel for its tool list; each advertised tool is
//! renamed to `agent_{id}_{name}` so calls can be routed back to the agent
//! that owns them. Agents that fail discovery contribute a diagnostic instead
//! of aborting the turn.

use crate::adapters::mcp_client::ToolClient;
use crate::domain::{AgentDiagnostic, AgentRecord, CatalogTool, ExecutionContext};
use futures::future::join_all;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum length of a sanitized tool name.
const MAX_TOOL_NAME_LEN: usize = 64;

/// Aggregated discovery output for one turn.
#[derive(Debug, Default)]
pub struct ToolInventory {
    /// Catalog entries in deterministic (agent id, tool order) order.
    pub catalog: Vec<CatalogTool>,
    /// Sanitized name -> owning agent routing info.
    pub contexts: HashMap<String, ExecutionContext>,
    /// Per-agent discovery outcomes.
    pub diagnostics: Vec<AgentDiagnostic>,
}

impl ToolInventory {
    /// Look up the routing context for a sanitized tool name.
    pub fn context_for(&self, sanitized_name: &str) -> Option<&ExecutionContext> {
        self.contexts.get(sanitized_name)
    }

    /// Original tool name behind a sanitized catalog name.
    pub fn original_name(&self, sanitized_name: &str) -> Option<&str> {
        self.catalog
            .iter()
            .find(|tool| tool.sanitized_name == sanitized_name)
            .map(|tool| tool.original_name.as_str())
    }
}

/// Namespace a tool under its owning agent and squeeze it into the
/// character set tool-calling models accept.
///
/// Characters outside `[A-Za-z0-9_]` become underscores, runs of
/// underscores collapse to one, and the result is truncated to 64
/// characters. Truncation can make two distinct tools collide; the
/// aggregator keeps the first and drops the rest with a warning.
pub fn sanitize_tool_name(agent_id: i64, original: &str) -> String {
    let raw = format!("agent_{agent_id}_{original}");

    let mut sanitized = String::with_capacity(raw.len());
    let mut last_was_underscore = false;
    for ch in raw.chars() {
        let mapped = if ch.is_ascii_alphanumeric() { ch } else { '_' };
        if mapped == '_' {
            if last_was_underscore {
                continue;
            }
            last_was_underscore = true;
        } else {
            last_was_underscore = false;
        }
        sanitized.push(mapped);
    }

    sanitized.chars().take(MAX_TOOL_NAME_LEN).collect()
}

/// Query every linked agent for its tools and merge the results.
///
/// Discovery runs concurrently across agents with a per-agent timeout.
/// Agents without an endpoint, unreachable agents, and timeouts all
/// degrade to diagnostics rather than errors.
pub async fn aggregate_tools(
    client: &dyn ToolClient,
    agents: &[AgentRecord],
    timeout: Duration,
) -> ToolInventory {
    let discoveries = agents.iter().map(|agent| discover_agent(client, agent, timeout));
    let outcomes = join_all(discoveries).await;

    let mut inventory = ToolInventory::default();

    for outcome in outcomes {
        match outcome {
            AgentDiscovery::Unconfigured { agent } => {
                warn!(agent_id = agent.id, agent_name = %agent.name, "agent has no endpoint, skipping discovery");
                inventory.diagnostics.push(AgentDiagnostic {
                    agent_id: agent.id,
                    agent_name: agent.name,
                    tool_count: 0,
                    error: Some("no endpoint configured".to_string()),
                });
            }
            AgentDiscovery::Failed { agent, error } => {
                warn!(agent_id = agent.id, agent_name = %agent.name, error = %error, "tool discovery failed");
                inventory.diagnostics.push(AgentDiagnostic {
                    agent_id: agent.id,
                    agent_name: agent.name,
                    tool_count: 0,
                    error: Some(error),
                });
            }
            AgentDiscovery::Listed { agent, endpoint, tools } => {
                let mut kept = 0usize;
                for tool in tools {
                    let sanitized = sanitize_tool_name(agent.id, &tool.name);
                    if inventory.contexts.contains_key(&sanitized) {
                        warn!(
                            agent_id = agent.id,
                            tool = %tool.name,
                            sanitized = %sanitized,
                            "sanitized tool name collides with an earlier entry, dropping"
                        );
                        continue;
                    }

                    inventory.contexts.insert(
                        sanitized.clone(),
                        ExecutionContext {
                            agent_id: agent.id,
                            agent_name: agent.name.clone(),
                            endpoint: endpoint.clone(),
                        },
                    );
                    inventory.catalog.push(CatalogTool {
                        sanitized_name: sanitized,
                        original_name: tool.name,
                        agent_id: agent.id,
                        agent_name: agent.name.clone(),
                        description: tool.description,
                        parameters: tool
                            .input_schema
                            .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
                    });
                    kept += 1;
                }

                debug!(agent_id = agent.id, agent_name = %agent.name, tools = kept, "discovered tools");
                inventory.diagnostics.push(AgentDiagnostic {
                    agent_id: agent.id,
                    agent_name: agent.name,
                    tool_count: kept,
                    error: None,
                });
            }
        }
    }

    inventory
}

enum AgentDiscovery {
    Unconfigured {
        agent: AgentRecord,
    },
    Failed {
        agent: AgentRecord,
        error: String,
    },
    Listed {
        agent: AgentRecord,
        endpoint: String,
        tools: Vec<crate::adapters::mcp_client::RemoteTool>,
    },
}

async fn discover_agent(
    client: &dyn ToolClient,
    agent: &AgentRecord,
    timeout: Duration,
) -> AgentDiscovery {
    let agent = agent.clone();

    let Some(endpoint) = agent.endpoint.clone() else {
        return AgentDiscovery::Unconfigured { agent };
    };

    let listing = tokio::time::timeout(timeout, async {
        let mut session = client.connect(&endpoint).await?;
        let tools = session.list_tools().await;
        // Disconnect even when listing fails; its own failure is secondary.
        let _ = session.disconnect().await;
        tools
    })
    .await;

    match listing {
        Err(_) => AgentDiscovery::Failed {
            agent,
            error: format!("tool discovery timed out after {}s", timeout.as_secs()),
        },
        Ok(Err(err)) => AgentDiscovery::Failed {
            agent,
            error: err.to_string(),
        },
        Ok(Ok(tools)) => AgentDiscovery::Listed {
            agent,
            endpoint,
            tools,
        },
    }
}
