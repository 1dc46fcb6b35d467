//! Conversation store trait and implementations
//!
//! The orchestrator reads conversation/agent rows and the message log
//! through [`ConversationStore`], and appends finalized transcript rows back
//! through it. A sqlx-backed implementation covers durable deployments; the
//! in-memory implementation backs test runs and databaseless operation.

use crate::domain::{AgentRecord, Conversation};
use crate::persistence::error::StoreError;
use crate::persistence::models::StoredMessage;
use crate::persistence::pool::ConnectionPool;
use async_trait::async_trait;
use sqlx::Row;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Read/append access to conversations, agents and the message log.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load a conversation by id.
    async fn get_conversation(&self, id: i64) -> Result<Conversation, StoreError>;

    /// Load an agent by id.
    async fn get_agent(&self, id: i64) -> Result<AgentRecord, StoreError>;

    /// Agents linked to a conversation, ordered by agent id.
    async fn linked_agents(&self, conversation_id: i64) -> Result<Vec<AgentRecord>, StoreError>;

    /// Message log for a conversation, ordered by insertion sequence.
    async fn load_messages(&self, conversation_id: i64) -> Result<Vec<StoredMessage>, StoreError>;

    /// Append one message row; the stored `seq` is assigned by the store.
    async fn append_message(
        &self,
        conversation_id: i64,
        message: &StoredMessage,
    ) -> Result<(), StoreError>;
}

/// SQL implementation over the Any-driver pool.
pub struct SqlxConversationStore {
    pool: ConnectionPool,
}

impl SqlxConversationStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for SqlxConversationStore {
    async fn get_conversation(&self, id: i64) -> Result<Conversation, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, main_agent_id, model, temperature, max_tokens \
             FROM conversations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?;

        match row {
            Some(row) => Ok(Conversation {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                main_agent_id: row.try_get("main_agent_id")?,
                model: row.try_get("model")?,
                temperature: row.try_get("temperature")?,
                max_tokens: row.try_get("max_tokens")?,
            }),
            None => Err(StoreError::not_found("conversation", id.to_string())),
        }
    }

    async fn get_agent(&self, id: i64) -> Result<AgentRecord, StoreError> {
        let row = sqlx::query("SELECT id, name, endpoint FROM agents WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;

        match row {
            Some(row) => Ok(AgentRecord {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                endpoint: row.try_get("endpoint")?,
            }),
            None => Err(StoreError::not_found("agent", id.to_string())),
        }
    }

    async fn linked_agents(&self, conversation_id: i64) -> Result<Vec<AgentRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT a.id, a.name, a.endpoint FROM agents a \
             JOIN agent_conversations ac ON ac.agent_id = a.id \
             WHERE ac.conversation_id = ? ORDER BY a.id",
        )
        .bind(conversation_id)
        .fetch_all(self.pool.pool())
        .await?;

        let mut agents = Vec::with_capacity(rows.len());
        for row in rows {
            agents.push(AgentRecord {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                endpoint: row.try_get("endpoint")?,
            });
        }
        Ok(agents)
    }

    async fn load_messages(&self, conversation_id: i64) -> Result<Vec<StoredMessage>, StoreError> {
        let rows = sqlx::query(
            "SELECT seq, role, content, kind, metadata FROM messages \
             WHERE conversation_id = ? ORDER BY seq",
        )
        .bind(conversation_id)
        .fetch_all(self.pool.pool())
        .await?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            let metadata: Option<String> = row.try_get("metadata")?;
            messages.push(StoredMessage {
                seq: row.try_get("seq")?,
                role: row.try_get("role")?,
                content: row.try_get("content")?,
                kind: row.try_get("kind")?,
                metadata: metadata
                    .as_deref()
                    .and_then(|raw| serde_json::from_str(raw).ok()),
            });
        }
        Ok(messages)
    }

    async fn append_message(
        &self,
        conversation_id: i64,
        message: &StoredMessage,
    ) -> Result<(), StoreError> {
        let metadata = message
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO messages (conversation_id, seq, role, content, kind, metadata, created_at) \
             SELECT ?, COALESCE(MAX(seq), -1) + 1, ?, ?, ?, ?, ? FROM messages WHERE conversation_id = ?",
        )
        .bind(conversation_id)
        .bind(&message.role)
        .bind(&message.content)
        .bind(&message.kind)
        .bind(metadata)
        .bind(&now)
        .bind(conversation_id)
        .execute(self.pool.pool())
        .await?;

        Ok(())
    }
}

#[derive(Default)]
struct InMemoryState {
    conversations: HashMap<i64, Conversation>,
    agents: HashMap<i64, AgentRecord>,
    links: HashMap<i64, Vec<i64>>,
    messages: HashMap<i64, Vec<StoredMessage>>,
}

/// Store backed by process memory. Used when no database URL is configured
/// and by the test suites.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<InMemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_conversation(&self, conversation: Conversation) {
        let mut state = self.state.write().await;
        state.conversations.insert(conversation.id, conversation);
    }

    pub async fn insert_agent(&self, agent: AgentRecord) {
        let mut state = self.state.write().await;
        state.agents.insert(agent.id, agent);
    }

    pub async fn link_agent(&self, conversation_id: i64, agent_id: i64) {
        let mut state = self.state.write().await;
        state.links.entry(conversation_id).or_default().push(agent_id);
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn get_conversation(&self, id: i64) -> Result<Conversation, StoreError> {
        let state = self.state.read().await;
        state
            .conversations
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("conversation", id.to_string()))
    }

    async fn get_agent(&self, id: i64) -> Result<AgentRecord, StoreError> {
        let state = self.state.read().await;
        state
            .agents
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("agent", id.to_string()))
    }

    async fn linked_agents(&self, conversation_id: i64) -> Result<Vec<AgentRecord>, StoreError> {
        let state = self.state.read().await;
        let mut agents: Vec<AgentRecord> = state
            .links
            .get(&conversation_id)
            .into_iter()
            .flatten()
            .filter_map(|agent_id| state.agents.get(agent_id).cloned())
            .collect();
        agents.sort_by_key(|agent| agent.id);
        Ok(agents)
    }

    async fn load_messages(&self, conversation_id: i64) -> Result<Vec<StoredMessage>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_message(
        &self,
        conversation_id: i64,
        message: &StoredMessage,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let log = state.messages.entry(conversation_id).or_default();
        let mut stored = message.clone();
        stored.seq = log.len() as i64;
        log.push(stored);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::models::kind;

    #[tokio::test]
    async fn in_memory_store_assigns_sequences() {
        let store = InMemoryStore::new();
        for content in ["first", "second"] {
            let message = StoredMessage {
                seq: 0,
                role: "user".to_string(),
                content: content.to_string(),
                kind: kind::TEXT.to_string(),
                metadata: None,
            };
            store.append_message(9, &message).await.unwrap();
        }

        let log = store.load_messages(9).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].seq, 0);
        assert_eq!(log[1].seq, 1);
        assert_eq!(log[1].content, "second");
    }

    #[tokio::test]
    async fn missing_conversation_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.get_conversation(1).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn linked_agents_are_ordered_by_id() {
        let store = InMemoryStore::new();
        for (id, name) in [(5, "beta"), (2, "alpha")] {
            store
                .insert_agent(AgentRecord {
                    id,
                    name: name.to_string(),
                    endpoint: Some(format!("http://{name}.local/mcp")),
                })
                .await;
            store.link_agent(1, id).await;
        }

        let agents = store.linked_agents(1).await.unwrap();
        assert_eq!(agents[0].id, 2);
        assert_eq!(agents[1].id, 5);
    }
}
