//! Persistent MCP session registry
//!
//! Keeps long-lived sessions to agent endpoints open under caller-chosen
//! ids, independent of orchestration runs. Connecting under an id that is
//! already registered disconnects and replaces the old session. All
//! sessions are disconnected on shutdown.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::adapters::mcp_client::{ToolClient, ToolClientError, ToolSession};

struct RegisteredSession {
    endpoint: String,
    connected_at: DateTime<Utc>,
    session: Box<dyn ToolSession>,
}

/// Registry of named long-lived sessions.
pub struct SessionRegistry {
    client: Arc<dyn ToolClient>,
    sessions: RwLock<HashMap<String, Arc<Mutex<RegisteredSession>>>>,
}

/// Summary of one registered session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub client_id: String,
    pub endpoint: String,
    pub connected_at: DateTime<Utc>,
}

impl SessionRegistry {
    pub fn new(client: Arc<dyn ToolClient>) -> Self {
        Self {
            client,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open a session under `client_id`, replacing any existing one.
    pub async fn connect(&self, client_id: &str, endpoint: &str) -> Result<(), ToolClientError> {
        let session = self.client.connect(endpoint).await?;

        let replaced = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(
                client_id.to_string(),
                Arc::new(Mutex::new(RegisteredSession {
                    endpoint: endpoint.to_string(),
                    connected_at: Utc::now(),
                    session,
                })),
            )
        };

        if let Some(old) = replaced {
            let mut old = old.lock().await;
            if let Err(err) = old.session.disconnect().await {
                warn!(client_id, error = %err, "failed to disconnect replaced session");
            }
        }

        info!(client_id, endpoint, "registered tool session");
        Ok(())
    }

    /// Disconnect and remove the session under `client_id`.
    pub async fn disconnect(&self, client_id: &str) -> bool {
        let removed = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(client_id)
        };

        match removed {
            Some(entry) => {
                let mut entry = entry.lock().await;
                if let Err(err) = entry.session.disconnect().await {
                    warn!(client_id, error = %err, "session disconnect failed");
                }
                info!(client_id, "removed tool session");
                true
            }
            None => false,
        }
    }

    /// Summaries of every registered session.
    pub async fn list(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().await;
        let mut infos = Vec::with_capacity(sessions.len());
        for (client_id, entry) in sessions.iter() {
            let entry = entry.lock().await;
            infos.push(SessionInfo {
                client_id: client_id.clone(),
                endpoint: entry.endpoint.clone(),
                connected_at: entry.connected_at,
            });
        }
        infos.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        infos
    }

    async fn session(&self, client_id: &str) -> Option<Arc<Mutex<RegisteredSession>>> {
        let sessions = self.sessions.read().await;
        sessions.get(client_id).cloned()
    }

    /// Run one operation against a registered session.
    pub async fn operate(
        &self,
        client_id: &str,
        operation: &SessionOperation,
    ) -> Result<Value, SessionOpError> {
        let entry = self
            .session(client_id)
            .await
            .ok_or_else(|| SessionOpError::UnknownClient(client_id.to_string()))?;
        let mut entry = entry.lock().await;

        match operation {
            SessionOperation::Ping => {
                // Reachability probe; a successful listing doubles as a ping.
                entry.session.list_tools().await?;
                Ok(json!({"ok": true}))
            }
            SessionOperation::ListTools => {
                let tools = entry.session.list_tools().await?;
                Ok(json!({"tools": tools}))
            }
            SessionOperation::CallTool { name, arguments } => {
                let reply = entry
                    .session
                    .call_tool(name, arguments.clone().unwrap_or_else(|| json!({})))
                    .await?;
                Ok(serde_json::to_value(&reply).unwrap_or(Value::Null))
            }
        }
    }

    /// Disconnect every registered session.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, Arc<Mutex<RegisteredSession>>)> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().collect()
        };

        for (client_id, entry) in drained {
            let mut entry = entry.lock().await;
            if let Err(err) = entry.session.disconnect().await {
                warn!(client_id, error = %err, "session disconnect failed during shutdown");
            }
        }
    }
}

/// Operation payload for `POST /mcp-client/{id}/operation`.
#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum SessionOperation {
    Ping,
    ListTools,
    #[serde(rename_all = "camelCase")]
    CallTool {
        name: String,
        #[serde(default)]
        arguments: Option<Value>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SessionOpError {
    #[error("no session registered for client '{0}'")]
    UnknownClient(String),

    #[error(transparent)]
    Client(#[from] ToolClientError),
}

impl IntoResponse for SessionOpError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            SessionOpError::UnknownClient(_) => StatusCode::NOT_FOUND,
            SessionOpError::Client(_) => StatusCode::BAD_GATEWAY,
        };
        let body = json!({"success": false, "error": self.to_string()});
        (status, Json(body)).into_response()
    }
}

/// Shared state for the session routes
#[derive(Clone)]
pub struct SessionState {
    pub registry: Arc<SessionRegistry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub client_id: String,
    pub endpoint: String,
}

/// POST /mcp-client/connect
pub async fn connect_session(
    State(state): State<SessionState>,
    Json(request): Json<ConnectRequest>,
) -> impl IntoResponse {
    match state
        .registry
        .connect(&request.client_id, &request.endpoint)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"success": true, "clientId": request.client_id})),
        ),
        Err(err) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({"success": false, "error": err.to_string()})),
        ),
    }
}

/// POST /mcp-client/{id}/disconnect
pub async fn disconnect_session(
    State(state): State<SessionState>,
    Path(client_id): Path<String>,
) -> impl IntoResponse {
    if state.registry.disconnect(&client_id).await {
        (StatusCode::OK, Json(json!({"success": true})))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "error": format!("no session registered for client '{client_id}'"),
            })),
        )
    }
}

/// GET /mcp-client
pub async fn list_sessions(State(state): State<SessionState>) -> impl IntoResponse {
    let sessions = state.registry.list().await;
    Json(json!({"sessions": sessions}))
}

/// POST /mcp-client/{id}/operation
pub async fn session_operation(
    State(state): State<SessionState>,
    Path(client_id): Path<String>,
    Json(operation): Json<SessionOperation>,
) -> Result<impl IntoResponse, SessionOpError> {
    let result = state.registry.operate(&client_id, &operation).await?;
    Ok(Json(json!({"success": true, "result": result})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mcp_client::{ContentPart, RemoteTool, ToolReply};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingClient {
        connects: AtomicUsize,
    }

    struct StubSession;

    #[async_trait]
    impl ToolClient for CountingClient {
        async fn connect(&self, endpoint: &str) -> Result<Box<dyn ToolSession>, ToolClientError> {
            if endpoint.contains("refuse") {
                return Err(ToolClientError::Transport("connection refused".to_string()));
            }
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(StubSession))
        }
    }

    #[async_trait]
    impl ToolSession for StubSession {
        async fn list_tools(&mut self) -> Result<Vec<RemoteTool>, ToolClientError> {
            Ok(vec![RemoteTool {
                name: "echo".to_string(),
                description: None,
                input_schema: None,
            }])
        }

        async fn call_tool(
            &mut self,
            name: &str,
            _arguments: Value,
        ) -> Result<ToolReply, ToolClientError> {
            Ok(ToolReply {
                content: vec![ContentPart::text(name.to_string())],
                metadata: None,
            })
        }

        async fn disconnect(&mut self) -> Result<(), ToolClientError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn connect_replaces_existing_session() {
        let client = Arc::new(CountingClient::default());
        let registry = SessionRegistry::new(client.clone());

        registry.connect("alpha", "http://one.local/mcp").await.unwrap();
        registry.connect("alpha", "http://two.local/mcp").await.unwrap();

        let sessions = registry.list().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].endpoint, "http://two.local/mcp");
        assert_eq!(client.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn operate_reaches_registered_session() {
        let registry = SessionRegistry::new(Arc::new(CountingClient::default()));
        registry.connect("alpha", "http://one.local/mcp").await.unwrap();

        let result = registry
            .operate("alpha", &SessionOperation::ListTools)
            .await
            .unwrap();
        assert_eq!(result["tools"][0]["name"], "echo");

        let err = registry
            .operate("ghost", &SessionOperation::Ping)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionOpError::UnknownClient(_)));
    }

    #[tokio::test]
    async fn disconnect_removes_session() {
        let registry = SessionRegistry::new(Arc::new(CountingClient::default()));
        registry.connect("alpha", "http://one.local/mcp").await.unwrap();

        assert!(registry.disconnect("alpha").await);
        assert!(!registry.disconnect("alpha").await);
        assert!(registry.list().await.is_empty());
    }
}
