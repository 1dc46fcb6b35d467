//! # Hermes - Multi-Agent Orchestration Server
//!
//! Hermes aggregates the tools of a conversation's linked agents into one
//! namespaced catalog, drives the main agent's chat tool with the full
//! message history plus that catalog, dispatches the tool calls it emits to
//! the agents that own them, folds the results back into the conversation,
//! and loops until the main agent answers in plain text or a bounded number
//! of round trips is spent.
//!
//! ## Architecture
//!
//! - **Domain**: messages, tool-call types, conversations
//! - **Orchestrator**: aggregation, extraction, dispatch, the run loop
//! - **Adapters**: MCP tool client, HTTP handlers, session registry
//! - **Persistence**: conversation store over sqlx or process memory

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod orchestrator;
pub mod persistence;

use crate::adapters::chat_handler::{self, ChatState};
use crate::adapters::session_registry::{self, SessionRegistry, SessionState};
use crate::orchestrator::Orchestrator;
use axum::{
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

/// Creates the Axum application router with all endpoints configured.
pub fn create_app(orchestrator: Arc<Orchestrator>, registry: Arc<SessionRegistry>) -> Router {
    let chat_state = ChatState { orchestrator };
    let session_state = SessionState { registry };

    let chat_router = Router::new()
        .route("/message/send", post(chat_handler::send_message))
        .with_state(chat_state);

    let session_router = Router::new()
        .route("/mcp-client", get(session_registry::list_sessions))
        .route("/mcp-client/connect", post(session_registry::connect_session))
        .route(
            "/mcp-client/:client_id/disconnect",
            post(session_registry::disconnect_session),
        )
        .route(
            "/mcp-client/:client_id/operation",
            post(session_registry::session_operation),
        )
        .with_state(session_state);

    let router = Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "ok"})) }),
        )
        .merge(chat_router)
        .merge(session_router);

    router.layer(
        tower_http::cors::CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}
