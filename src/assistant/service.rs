//! Conversation orchestration over the chat store and model client

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{ChatClient, PromptMessage};
use crate::store::ChatStore;
use crate::types::{AssistantCreateRequest, ChatMessage, ChatState, Role};

/// Instructions applied to assistants created without an explicit prompt
pub const DEFAULT_INSTRUCTIONS: &str = "Don't make assumptions about what values to plug into functions. Ask for clarification if a user request is ambiguous.";

/// Coordinates assistant creation, message exchange, and state queries
pub struct AssistantService {
    store: Arc<ChatStore>,
    client: Arc<dyn ChatClient>,
    deployment_name: String,
    max_recent_messages: usize,
}

impl AssistantService {
    pub fn new(config: &Config, store: Arc<ChatStore>, client: Arc<dyn ChatClient>) -> Self {
        Self {
            store,
            client,
            deployment_name: config.chat.deployment_name.clone(),
            max_recent_messages: config.chat.max_recent_messages,
        }
    }

    /// Create an assistant, resetting any existing conversation with the same id
    pub fn create(&self, id: &str, instructions: &str) -> Result<()> {
        let request = AssistantCreateRequest {
            id: id.to_string(),
            instructions: instructions.to_string(),
        };
        self.store.create_assistant(&request)?;

        tracing::info!("Created assistant {}", id);
        Ok(())
    }

    /// Post a user message and run the model over the conversation.
    ///
    /// The returned envelope lists this exchange's messages with the assistant
    /// reply at index 0.
    pub async fn post_message(&self, id: &str, message: &str) -> Result<ChatState> {
        let record = self
            .store
            .get_assistant(id)?
            .ok_or_else(|| Error::AssistantNotFound(id.to_string()))?;

        let history = self.store.messages_since(
            id,
            DateTime::<Utc>::UNIX_EPOCH,
            self.max_recent_messages,
        )?;

        let user_message = ChatMessage::new(id, Role::User, message);
        self.store.append_message(&user_message)?;

        let mut prompt = Vec::with_capacity(history.len() + 2);
        prompt.push(PromptMessage {
            role: Role::System,
            content: record.instructions.clone(),
        });
        for past in history {
            prompt.push(PromptMessage {
                role: past.role,
                content: past.content,
            });
        }
        prompt.push(PromptMessage {
            role: Role::User,
            content: message.to_string(),
        });

        tracing::debug!(
            "Running chat completion for assistant {} over {} prompt messages",
            id,
            prompt.len()
        );
        let reply = self.client.complete(&self.deployment_name, &prompt).await?;

        let reply_message = ChatMessage::new(id, Role::Assistant, reply);
        self.store.append_message(&reply_message)?;

        Ok(ChatState {
            id: id.to_string(),
            exists: true,
            created_at: Some(record.created_at),
            last_updated_at: Some(reply_message.created_at),
            total_messages: self.store.message_count(id)?,
            recent_messages: vec![reply_message, user_message],
        })
    }

    /// Chat state for an assistant, filtered to messages at or after `since`.
    ///
    /// An unknown id yields an envelope with `exists: false` rather than an
    /// error, matching the write-side create semantics where ids are chosen by
    /// the caller.
    pub fn chat_state(&self, id: &str, since: Option<DateTime<Utc>>) -> Result<ChatState> {
        let Some(record) = self.store.get_assistant(id)? else {
            return Ok(ChatState::missing(id));
        };

        let since = since.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let recent_messages = self
            .store
            .messages_since(id, since, self.max_recent_messages)?;

        Ok(ChatState {
            id: id.to_string(),
            exists: true,
            created_at: Some(record.created_at),
            last_updated_at: Some(record.last_updated_at),
            total_messages: self.store.message_count(id)?,
            recent_messages,
        })
    }
}
