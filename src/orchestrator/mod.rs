//! Multi-agent orchestration
//!
//! The run loop at the center of the service: build the message buffer from
//! persisted history plus newly submitted messages, aggregate the tool
//! catalog across linked agents, then iterate: call the main agent's chat
//! tool, extract any tool-call requests from its reply, dispatch each to its
//! owning agent, fold the results back in as tool messages, and go again.
//! The loop ends on a plain-text reply or at the iteration cap.

pub mod aggregator;
pub mod dispatcher;
pub mod error;
pub mod extract;
pub mod history;

pub use aggregator::{aggregate_tools, sanitize_tool_name, ToolInventory};
pub use error::OrchestratorError;

use crate::adapters::mcp_client::ToolClient;
use crate::domain::{normalize_message, AgentDiagnostic, Conversation, IncomingMessage, Message};
use crate::persistence::{ConversationStore, StoredMessage};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default bound on main-agent round trips per run.
pub const DEFAULT_MAX_ITERATIONS: usize = 6;

/// Tunables for one orchestrator instance.
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    /// Hard bound on main-agent round trips per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Wall-clock bound per remote call, seconds
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// Name of the main agent's chat tool
    #[serde(default = "default_chat_tool_name")]
    pub chat_tool_name: String,
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_call_timeout_secs() -> u64 {
    120
}

fn default_chat_tool_name() -> String {
    "chat".to_string()
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            call_timeout_secs: default_call_timeout_secs(),
            chat_tool_name: default_chat_tool_name(),
        }
    }
}

impl OrchestratorConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// One inbound orchestration request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub conversation_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub messages: Vec<IncomingMessage>,
}

/// Result of one completed run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Final assistant text (may be empty at the iteration cap)
    pub reply_text: String,
    /// Messages produced during this run, submitted user turns included
    pub new_messages: Vec<Message>,
    /// Main-agent round trips consumed
    pub iterations: usize,
    /// Whether the run stopped at the cap with calls still pending
    pub cap_reached: bool,
    /// Per-agent tool discovery outcomes
    pub diagnostics: Vec<AgentDiagnostic>,
}

/// Drives the iterate-call-dispatch-fold cycle for one conversation turn.
pub struct Orchestrator {
    store: Arc<dyn ConversationStore>,
    client: Arc<dyn ToolClient>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        client: Arc<dyn ToolClient>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            client,
            config,
        }
    }

    pub fn store(&self) -> Arc<dyn ConversationStore> {
        self.store.clone()
    }

    /// Execute one orchestration run end to end.
    ///
    /// Validation, ownership, and configuration failures reject the request
    /// before any remote call. A main-agent failure aborts the run; failures
    /// of individual tool calls are folded into the transcript instead.
    pub async fn run(&self, request: &RunRequest) -> Result<RunOutcome, OrchestratorError> {
        let conversation = self.store.get_conversation(request.conversation_id).await.map_err(
            |err| {
                if err.is_not_found() {
                    OrchestratorError::not_found(
                        "conversation",
                        request.conversation_id.to_string(),
                    )
                } else {
                    OrchestratorError::Store(err)
                }
            },
        )?;

        if conversation.user_id != request.user_id {
            return Err(OrchestratorError::Forbidden(format!(
                "conversation {} does not belong to user {}",
                conversation.id, request.user_id
            )));
        }

        let main_agent_id = conversation.main_agent_id.ok_or_else(|| {
            OrchestratorError::Configuration(format!(
                "conversation {} has no main agent",
                conversation.id
            ))
        })?;

        let main_agent = self.store.get_agent(main_agent_id).await.map_err(|err| {
            if err.is_not_found() {
                OrchestratorError::not_found("agent", main_agent_id.to_string())
            } else {
                OrchestratorError::Store(err)
            }
        })?;

        let main_endpoint = main_agent.endpoint.clone().ok_or_else(|| {
            OrchestratorError::Configuration(format!(
                "main agent '{}' has no endpoint",
                main_agent.name
            ))
        })?;

        // Reject malformed input before touching anything remote.
        let mut submitted = Vec::with_capacity(request.messages.len());
        for (index, raw) in request.messages.iter().enumerate() {
            let path = format!("messages[{index}]");
            submitted.push(normalize_message(raw, &path)?);
        }

        let stored = self.store.load_messages(conversation.id).await?;
        let mut buffer = history::reconstruct(conversation.id, &stored);
        buffer.extend(submitted.iter().cloned());

        let linked = self.store.linked_agents(conversation.id).await?;
        let inventory =
            aggregate_tools(self.client.as_ref(), &linked, self.config.call_timeout()).await;

        info!(
            conversation_id = conversation.id,
            agents = linked.len(),
            tools = inventory.catalog.len(),
            "starting orchestration run"
        );

        let mut new_messages = submitted;
        let mut reply_text = String::new();
        let mut iterations = 0usize;
        let mut cap_reached = false;

        loop {
            if iterations >= self.config.max_iterations {
                warn!(
                    conversation_id = conversation.id,
                    iterations, "iteration cap reached with tool calls pending"
                );
                cap_reached = true;
                break;
            }
            iterations += 1;

            let reply = self
                .call_chat_tool(&main_endpoint, &conversation, &buffer, &inventory)
                .await?;

            let (text, calls) = extract::extract_reply(&reply);

            let assistant = if calls.is_empty() {
                Message::assistant(text.clone())
            } else {
                Message::assistant_with_tools(text.clone(), calls.clone())
            };
            buffer.push(assistant.clone());
            new_messages.push(assistant);
            reply_text = text;

            if calls.is_empty() {
                debug!(
                    conversation_id = conversation.id,
                    iterations, "main agent produced a final reply"
                );
                break;
            }

            // Sequential on purpose: tool calls may have side effects and the
            // main agent may assume ordering.
            for call in &calls {
                let result = dispatcher::dispatch(
                    self.client.as_ref(),
                    call,
                    &inventory,
                    self.config.call_timeout(),
                )
                .await;

                let tool_message =
                    Message::tool_result(&result.id, &result.tool_name, &result.content);
                buffer.push(tool_message.clone());
                new_messages.push(tool_message);
            }
        }

        Ok(RunOutcome {
            reply_text,
            new_messages,
            iterations,
            cap_reached,
            diagnostics: inventory.diagnostics.clone(),
        })
    }

    async fn call_chat_tool(
        &self,
        endpoint: &str,
        conversation: &Conversation,
        buffer: &[Message],
        inventory: &ToolInventory,
    ) -> Result<crate::adapters::mcp_client::ToolReply, OrchestratorError> {
        let arguments = build_chat_arguments(conversation, buffer, inventory)?;

        let invocation = tokio::time::timeout(self.config.call_timeout(), async {
            let mut session = self.client.connect(endpoint).await?;
            let reply = session
                .call_tool(&self.config.chat_tool_name, arguments)
                .await;
            let _ = session.disconnect().await;
            reply
        })
        .await;

        match invocation {
            Err(_) => Err(OrchestratorError::Upstream(format!(
                "chat tool call timed out after {}s",
                self.config.call_timeout_secs
            ))),
            Ok(Err(err)) => Err(err.into()),
            Ok(Ok(reply)) => Ok(reply),
        }
    }

    /// Persist this run's messages to the store, one append per message.
    ///
    /// Failures are logged and swallowed; the caller has already received
    /// its reply.
    pub async fn persist_transcript(
        store: Arc<dyn ConversationStore>,
        conversation_id: i64,
        messages: Vec<Message>,
    ) {
        for message in &messages {
            let row = StoredMessage::from_message(0, message);
            if let Err(err) = store.append_message(conversation_id, &row).await {
                error!(conversation_id, error = %err, "failed to persist transcript message");
            }
        }
    }

    /// Fire-and-forget variant of [`Self::persist_transcript`].
    pub fn spawn_persist(&self, conversation_id: i64, messages: Vec<Message>) {
        let store = self.store.clone();
        tokio::spawn(async move {
            Self::persist_transcript(store, conversation_id, messages).await;
        });
    }
}

/// Assemble the argument object for the main agent's chat tool.
fn build_chat_arguments(
    conversation: &Conversation,
    buffer: &[Message],
    inventory: &ToolInventory,
) -> Result<Value, OrchestratorError> {
    let messages = serde_json::to_value(buffer)
        .map_err(|err| OrchestratorError::Upstream(format!("failed to encode messages: {err}")))?;

    let mut arguments = serde_json::Map::new();
    arguments.insert("messages".to_string(), messages);

    if let Some(model) = &conversation.model {
        arguments.insert("model".to_string(), json!(model));
    }
    if let Some(temperature) = conversation.temperature {
        arguments.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(max_tokens) = conversation.max_tokens {
        arguments.insert("maxTokens".to_string(), json!(max_tokens));
    }

    if !inventory.catalog.is_empty() {
        let tools: Vec<Value> = inventory
            .catalog
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.sanitized_name,
                    "description": tool.description.clone().unwrap_or_default(),
                    "parameters": tool.parameters,
                })
            })
            .collect();
        arguments.insert("tools".to_string(), json!(tools));
        arguments.insert("toolChoice".to_string(), json!("auto"));
    }

    Ok(Value::Object(arguments))
}
