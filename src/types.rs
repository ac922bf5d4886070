//! Core types for Concierge

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// A single message in an assistant conversation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub assistant_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(assistant_id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            assistant_id: assistant_id.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Envelope handed to the assistant service when creating an assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantCreateRequest {
    pub id: String,
    pub instructions: String,
}

/// Stored assistant row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantRecord {
    pub id: String,
    pub instructions: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

/// Snapshot of an assistant conversation returned by the chat endpoints.
///
/// After a posted query, `recent_messages` holds the messages produced by that
/// exchange with the assistant reply at index 0. For state queries it holds
/// the stored history at or after the requested timestamp, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatState {
    pub id: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<DateTime<Utc>>,
    pub total_messages: usize,
    pub recent_messages: Vec<ChatMessage>,
}

impl ChatState {
    /// State envelope for an assistant id that has never been created
    pub fn missing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            exists: false,
            created_at: None,
            last_updated_at: None,
            total_messages: 0,
            recent_messages: Vec::new(),
        }
    }
}
