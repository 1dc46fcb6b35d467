//! HTTP boundary for orchestration runs
//!
//! `POST /message/send` carries `{conversationId, userId, messages}` and
//! answers with the final reply plus every message produced during the run.
//! Transcript persistence is kicked off after the response is computed and
//! never delays or fails it.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::domain::{AgentDiagnostic, Message};
use crate::orchestrator::{Orchestrator, OrchestratorError, RunRequest};

/// Shared application state for the chat route
#[derive(Clone)]
pub struct ChatState {
    pub orchestrator: Arc<Orchestrator>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub reply: ReplyBody,
    pub messages: Vec<Message>,
    pub iterations: usize,
    pub cap_reached: bool,
    pub diagnostics: Vec<AgentDiagnostic>,
}

#[derive(Serialize)]
pub struct ReplyBody {
    pub text: String,
}

impl IntoResponse for OrchestratorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "success": false,
            "error": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// POST /message/send
pub async fn send_message(
    State(state): State<ChatState>,
    Json(request): Json<RunRequest>,
) -> Result<impl IntoResponse, OrchestratorError> {
    let outcome = state.orchestrator.run(&request).await?;

    info!(
        conversation_id = request.conversation_id,
        iterations = outcome.iterations,
        messages = outcome.new_messages.len(),
        "orchestration run complete"
    );

    state
        .orchestrator
        .spawn_persist(request.conversation_id, outcome.new_messages.clone());

    let response = SendMessageResponse {
        reply: ReplyBody {
            text: outcome.reply_text,
        },
        messages: outcome.new_messages,
        iterations: outcome.iterations,
        cap_reached: outcome.cap_reached,
        diagnostics: outcome.diagnostics,
    };

    Ok((StatusCode::OK, Json(response)))
}
