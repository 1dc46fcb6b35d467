//! HTTP-level tests for the router
//!
//! Exercise the axum app with in-process requests: health, the chat route's
//! error → status mapping, and the session registry lifecycle.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use hermes::adapters::mcp_client::{
    ContentPart, RemoteTool, ToolClient, ToolClientError, ToolReply, ToolSession,
};
use hermes::adapters::session_registry::SessionRegistry;
use hermes::domain::{AgentRecord, Conversation};
use hermes::orchestrator::{Orchestrator, OrchestratorConfig};
use hermes::persistence::InMemoryStore;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

struct StubClient;

struct StubSession;

#[async_trait]
impl ToolClient for StubClient {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn ToolSession>, ToolClientError> {
        if endpoint.contains("refuse") {
            return Err(ToolClientError::Transport("connection refused".to_string()));
        }
        Ok(Box::new(StubSession))
    }
}

#[async_trait]
impl ToolSession for StubSession {
    async fn list_tools(&mut self) -> Result<Vec<RemoteTool>, ToolClientError> {
        Ok(vec![])
    }

    async fn call_tool(
        &mut self,
        _name: &str,
        _arguments: Value,
    ) -> Result<ToolReply, ToolClientError> {
        Ok(ToolReply {
            content: vec![ContentPart::text("A fine answer.")],
            metadata: None,
        })
    }

    async fn disconnect(&mut self) -> Result<(), ToolClientError> {
        Ok(())
    }
}

async fn test_app() -> axum::Router {
    let store = Arc::new(InMemoryStore::new());
    store
        .insert_conversation(Conversation {
            id: 1,
            user_id: 1,
            main_agent_id: Some(1),
            model: None,
            temperature: None,
            max_tokens: None,
        })
        .await;
    store
        .insert_agent(AgentRecord {
            id: 1,
            name: "assistant".to_string(),
            endpoint: Some("http://main.local/mcp".to_string()),
        })
        .await;

    let client = Arc::new(StubClient);
    let orchestrator = Arc::new(Orchestrator::new(
        store,
        client.clone(),
        OrchestratorConfig::default(),
    ));
    let registry = Arc::new(SessionRegistry::new(client));
    hermes::create_app(orchestrator, registry)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = test_app().await;
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn send_message_returns_the_final_reply() {
    let app = test_app().await;
    let request = post_json(
        "/message/send",
        json!({
            "conversationId": 1,
            "userId": 1,
            "messages": [{"role": "user", "content": "hello"}],
        }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["reply"]["text"], "A fine answer.");
    assert_eq!(body["iterations"], 1);
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn ownership_mismatch_maps_to_403() {
    let app = test_app().await;
    let request = post_json(
        "/message/send",
        json!({
            "conversationId": 1,
            "userId": 99,
            "messages": [{"role": "user", "content": "hello"}],
        }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_conversation_maps_to_404() {
    let app = test_app().await;
    let request = post_json(
        "/message/send",
        json!({
            "conversationId": 77,
            "userId": 1,
            "messages": [{"role": "user", "content": "hello"}],
        }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_message_maps_to_400() {
    let app = test_app().await;
    let request = post_json(
        "/message/send",
        json!({
            "conversationId": 1,
            "userId": 1,
            "messages": [{"role": "oracle", "content": "hello"}],
        }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("messages[0].role"));
}

#[tokio::test]
async fn session_registry_lifecycle_over_http() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/mcp-client/connect",
            json!({"clientId": "alpha", "endpoint": "http://agent.local/mcp"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(Request::get("/mcp-client").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["sessions"][0]["clientId"], "alpha");

    let response = app
        .clone()
        .oneshot(post_json(
            "/mcp-client/alpha/operation",
            json!({"operation": "callTool", "name": "chat", "arguments": {}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["result"]["content"][0]["text"], "A fine answer.");

    let response = app
        .clone()
        .oneshot(post_json("/mcp-client/alpha/disconnect", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json("/mcp-client/alpha/disconnect", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn connect_failure_maps_to_502() {
    let app = test_app().await;
    let response = app
        .oneshot(post_json(
            "/mcp-client/connect",
            json!({"clientId": "beta", "endpoint": "http://refuse.local/mcp"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
