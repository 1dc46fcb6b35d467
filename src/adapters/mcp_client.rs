//! MCP Client Adapter
//!
//! Client-side access to remote agents over the MCP tool-invocation
//! protocol. Each agent endpoint is reached through a short-lived session:
//! connect, list or call tools, disconnect. The orchestrator only depends on
//! the [`ToolClient`] / [`ToolSession`] traits so tests can substitute an
//! in-process double.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors raised while talking to a remote agent.
#[derive(Debug, Error)]
pub enum ToolClientError {
    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote error [{code}]: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ToolClientError {
    fn from(err: reqwest::Error) -> Self {
        ToolClientError::Transport(err.to_string())
    }
}

/// A tool advertised by a remote agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTool {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: Option<Value>,
}

/// One content part of a tool-call reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            part_type: "text".to_string(),
            text: Some(text.into()),
        }
    }
}

/// Result of invoking a remote tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolReply {
    #[serde(default)]
    pub content: Vec<ContentPart>,
    #[serde(default, alias = "_meta", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ToolReply {
    /// Concatenated text of all `text` content parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|part| part.part_type == "text")
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

/// Opens sessions to agent endpoints.
#[async_trait]
pub trait ToolClient: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn ToolSession>, ToolClientError>;
}

/// One open session to a single agent endpoint.
#[async_trait]
pub trait ToolSession: Send {
    async fn list_tools(&mut self) -> Result<Vec<RemoteTool>, ToolClientError>;

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolReply, ToolClientError>;

    async fn disconnect(&mut self) -> Result<(), ToolClientError>;
}

/// MCP JSON-RPC request
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

/// MCP JSON-RPC response
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: Option<String>,
    #[allow(dead_code)]
    id: Option<u64>,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ListToolsResult {
    tools: Vec<RemoteTool>,
}

/// HTTP implementation of [`ToolClient`] speaking JSON-RPC 2.0 POSTs.
pub struct HttpToolClient {
    client: Client,
    bearer_token: Option<String>,
}

impl HttpToolClient {
    /// Create a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            bearer_token: None,
        }
    }

    /// Attach a static bearer token to every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

#[async_trait]
impl ToolClient for HttpToolClient {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn ToolSession>, ToolClientError> {
        let url = reqwest::Url::parse(endpoint)
            .map_err(|_| ToolClientError::InvalidEndpoint(endpoint.to_string()))?;

        debug!(endpoint = %url, "opening tool session");

        Ok(Box::new(HttpToolSession {
            client: self.client.clone(),
            url,
            bearer_token: self.bearer_token.clone(),
            request_id: 0,
        }))
    }
}

struct HttpToolSession {
    client: Client,
    url: reqwest::Url,
    bearer_token: Option<String>,
    request_id: u64,
}

impl HttpToolSession {
    fn next_id(&mut self) -> u64 {
        self.request_id += 1;
        self.request_id
    }

    async fn send_request(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, ToolClientError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id(),
            method: method.to_string(),
            params,
        };

        let mut builder = self.client.post(self.url.clone()).json(&request);

        if let Some(token) = &self.bearer_token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ToolClientError::Transport(format!(
                "endpoint returned {status}: {text}"
            )));
        }

        let envelope: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ToolClientError::Malformed(e.to_string()))?;

        if let Some(error) = envelope.error {
            return Err(ToolClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        envelope
            .result
            .ok_or_else(|| ToolClientError::Malformed("response carried no result".to_string()))
    }
}

#[async_trait]
impl ToolSession for HttpToolSession {
    async fn list_tools(&mut self) -> Result<Vec<RemoteTool>, ToolClientError> {
        let result = self.send_request("tools/list", None).await?;
        let listed: ListToolsResult = serde_json::from_value(result)
            .map_err(|e| ToolClientError::Malformed(e.to_string()))?;
        Ok(listed.tools)
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolReply, ToolClientError> {
        let params = json!({
            "name": name,
            "arguments": arguments,
        });

        let result = self.send_request("tools/call", Some(params)).await?;
        serde_json::from_value(result).map_err(|e| ToolClientError::Malformed(e.to_string()))
    }

    async fn disconnect(&mut self) -> Result<(), ToolClientError> {
        // Plain request/response transport; nothing to tear down.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_text_joins_text_parts_only() {
        let reply = ToolReply {
            content: vec![
                ContentPart::text("Hello, "),
                ContentPart {
                    part_type: "image".to_string(),
                    text: None,
                },
                ContentPart::text("world"),
            ],
            metadata: None,
        };
        assert_eq!(reply.text(), "Hello, world");
    }

    #[test]
    fn reply_text_empty_when_no_text_parts() {
        let reply = ToolReply::default();
        assert_eq!(reply.text(), "");
    }

    #[tokio::test]
    async fn connect_rejects_invalid_endpoint() {
        let client = HttpToolClient::new(Duration::from_secs(1));
        match client.connect("not a url").await {
            Err(ToolClientError::InvalidEndpoint(endpoint)) => {
                assert_eq!(endpoint, "not a url");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("invalid endpoint was accepted"),
        }
    }
}
