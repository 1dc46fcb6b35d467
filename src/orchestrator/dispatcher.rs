//! Tool Call Dispatcher
//!
//! Routes one extracted tool call to the agent that owns it: resolve the
//! sanitized name through the inventory, open a session to the owning
//! agent's endpoint, call the tool under its original name, and fold the
//! reply text into a [`ToolCallResult`]. Every failure mode is an
//! error-bearing result rather than an `Err` so one bad call never aborts
//! the turn.

use crate::adapters::mcp_client::ToolClient;
use crate::domain::{ToolCallRequest, ToolCallResult};
use crate::orchestrator::aggregator::ToolInventory;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Execute a single tool call against its owning agent.
pub async fn dispatch(
    client: &dyn ToolClient,
    request: &ToolCallRequest,
    inventory: &ToolInventory,
    timeout: Duration,
) -> ToolCallResult {
    let Some(context) = inventory.context_for(&request.name) else {
        warn!(tool = %request.name, "tool call names no catalog entry");
        return ToolCallResult::failure(
            &request.id,
            "",
            &request.name,
            format!("unknown tool '{}'", request.name),
        );
    };

    let Some(original_name) = inventory.original_name(&request.name) else {
        // Context without a catalog row would mean the inventory was built
        // inconsistently; treat it like an unknown tool.
        warn!(tool = %request.name, "catalog entry missing for routed tool");
        return ToolCallResult::failure(
            &request.id,
            &context.agent_name,
            &request.name,
            format!("unknown tool '{}'", request.name),
        );
    };

    let arguments: Value = match serde_json::from_str(&request.arguments) {
        Ok(value) => value,
        Err(err) => {
            warn!(tool = %request.name, error = %err, "tool arguments are not valid JSON");
            return ToolCallResult::failure(
                &request.id,
                &context.agent_name,
                original_name,
                format!("invalid arguments ({err}): {}", request.arguments),
            );
        }
    };

    debug!(
        agent = %context.agent_name,
        tool = %original_name,
        call_id = %request.id,
        "dispatching tool call"
    );

    let invocation = tokio::time::timeout(timeout, async {
        let mut session = client.connect(&context.endpoint).await?;
        let reply = session.call_tool(original_name, arguments).await;
        let _ = session.disconnect().await;
        reply
    })
    .await;

    match invocation {
        Err(_) => ToolCallResult::failure(
            &request.id,
            &context.agent_name,
            original_name,
            format!("tool call timed out after {}s", timeout.as_secs()),
        ),
        Ok(Err(err)) => ToolCallResult::failure(
            &request.id,
            &context.agent_name,
            original_name,
            err.to_string(),
        ),
        Ok(Ok(reply)) => ToolCallResult::success(
            &request.id,
            &context.agent_name,
            original_name,
            reply.text(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mcp_client::{
        RemoteTool, ToolClientError, ToolReply, ToolSession,
    };
    use crate::domain::{CatalogTool, ExecutionContext};
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoClient;

    struct EchoSession;

    #[async_trait]
    impl ToolClient for EchoClient {
        async fn connect(
            &self,
            _endpoint: &str,
        ) -> Result<Box<dyn ToolSession>, ToolClientError> {
            Ok(Box::new(EchoSession))
        }
    }

    #[async_trait]
    impl ToolSession for EchoSession {
        async fn list_tools(&mut self) -> Result<Vec<RemoteTool>, ToolClientError> {
            Ok(vec![])
        }

        async fn call_tool(
            &mut self,
            name: &str,
            arguments: Value,
        ) -> Result<ToolReply, ToolClientError> {
            Ok(ToolReply {
                content: vec![crate::adapters::mcp_client::ContentPart::text(format!(
                    "{name}:{arguments}"
                ))],
                metadata: None,
            })
        }

        async fn disconnect(&mut self) -> Result<(), ToolClientError> {
            Ok(())
        }
    }

    fn inventory_with(sanitized: &str, original: &str) -> ToolInventory {
        let mut inventory = ToolInventory::default();
        inventory.contexts.insert(
            sanitized.to_string(),
            ExecutionContext {
                agent_id: 2,
                agent_name: "researcher".to_string(),
                endpoint: "http://agent.local/mcp".to_string(),
            },
        );
        inventory.catalog.push(CatalogTool {
            sanitized_name: sanitized.to_string(),
            original_name: original.to_string(),
            agent_id: 2,
            agent_name: "researcher".to_string(),
            description: None,
            parameters: json!({}),
        });
        inventory
    }

    #[tokio::test]
    async fn dispatch_resolves_original_name() {
        let inventory = inventory_with("agent_2_search", "search");
        let request = ToolCallRequest {
            id: "call_1".to_string(),
            name: "agent_2_search".to_string(),
            arguments: "{\"q\":\"rust\"}".to_string(),
        };

        let result = dispatch(&EchoClient, &request, &inventory, Duration::from_secs(5)).await;
        assert!(!result.is_error);
        assert_eq!(result.agent_name, "researcher");
        assert_eq!(result.tool_name, "search");
        assert!(result.content.starts_with("search:"));
    }

    #[tokio::test]
    async fn unknown_tool_becomes_error_result() {
        let inventory = ToolInventory::default();
        let request = ToolCallRequest {
            id: "call_1".to_string(),
            name: "agent_9_ghost".to_string(),
            arguments: "{}".to_string(),
        };

        let result = dispatch(&EchoClient, &request, &inventory, Duration::from_secs(5)).await;
        assert!(result.is_error);
        assert!(result.content.contains("unknown tool"));
    }

    #[tokio::test]
    async fn malformed_arguments_become_error_result_preserving_payload() {
        let inventory = inventory_with("agent_2_search", "search");
        let request = ToolCallRequest {
            id: "call_1".to_string(),
            name: "agent_2_search".to_string(),
            arguments: "not json".to_string(),
        };

        let result = dispatch(&EchoClient, &request, &inventory, Duration::from_secs(5)).await;
        assert!(result.is_error);
        assert!(result.content.contains("not json"));
    }
}
