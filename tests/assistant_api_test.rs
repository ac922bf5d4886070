//! Integration tests for Concierge core functionality
//! Tests the chat store, the assistant service, and the HTTP API

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;
use tower::ServiceExt;

use concierge::api::{create_router, AppState};
use concierge::assistant::{AssistantService, DEFAULT_INSTRUCTIONS};
use concierge::config::Config;
use concierge::error::{Error, Result};
use concierge::model::{ChatClient, PromptMessage};
use concierge::store::ChatStore;
use concierge::types::{ChatMessage, Role};

/// Chat backend that returns a fixed reply and records every prompt it sees
struct MockChatClient {
    reply: String,
    prompts: std::sync::Mutex<Vec<Vec<PromptMessage>>>,
}

impl MockChatClient {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn recorded_prompts(&self) -> Vec<Vec<PromptMessage>> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(&self, _deployment: &str, messages: &[PromptMessage]) -> Result<String> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        Ok(self.reply.clone())
    }
}

/// Test fixture wiring a temp-dir store to a mock model backend
struct TestFixture {
    _temp_dir: TempDir,
    pub store: Arc<ChatStore>,
    pub service: Arc<AssistantService>,
    pub client: Arc<MockChatClient>,
}

impl TestFixture {
    fn new(reply: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.data_path = temp_dir.path().to_path_buf();

        let store =
            Arc::new(ChatStore::open(&config.db_path()).expect("Failed to open chat store"));
        let client = Arc::new(MockChatClient::new(reply));
        let service = Arc::new(AssistantService::new(
            &config,
            store.clone(),
            client.clone(),
        ));

        Self {
            _temp_dir: temp_dir,
            store,
            service,
            client,
        }
    }

    fn router(&self) -> axum::Router {
        create_router(AppState {
            service: self.service.clone(),
        })
    }
}

// ============================================================================
// ChatStore Tests
// ============================================================================

mod store_tests {
    use super::*;
    use concierge::types::AssistantCreateRequest;

    fn create_request(id: &str) -> AssistantCreateRequest {
        AssistantCreateRequest {
            id: id.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_assistant() {
        let fixture = TestFixture::new("hi");

        fixture
            .store
            .create_assistant(&create_request("abc"))
            .expect("Should create assistant");

        let record = fixture
            .store
            .get_assistant("abc")
            .expect("Should query assistant")
            .expect("Assistant should exist");

        assert_eq!(record.id, "abc");
        assert_eq!(record.instructions, DEFAULT_INSTRUCTIONS);
    }

    #[tokio::test]
    async fn test_get_assistant_not_found() {
        let fixture = TestFixture::new("hi");

        let record = fixture
            .store
            .get_assistant("missing")
            .expect("Should query assistant");

        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_recreate_resets_conversation() {
        let fixture = TestFixture::new("hi");

        fixture
            .store
            .create_assistant(&create_request("abc"))
            .expect("Should create assistant");
        fixture
            .store
            .append_message(&ChatMessage::new("abc", Role::User, "hello"))
            .expect("Should append message");
        fixture
            .store
            .append_message(&ChatMessage::new("abc", Role::Assistant, "hi there"))
            .expect("Should append message");
        assert_eq!(fixture.store.message_count("abc").unwrap(), 2);

        fixture
            .store
            .create_assistant(&create_request("abc"))
            .expect("Should recreate assistant");

        assert_eq!(fixture.store.message_count("abc").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_messages_since_filters_and_orders() {
        let fixture = TestFixture::new("hi");

        fixture
            .store
            .create_assistant(&create_request("abc"))
            .expect("Should create assistant");

        let cutoff = Utc::now();

        let mut old = ChatMessage::new("abc", Role::User, "old message");
        old.created_at = cutoff - Duration::minutes(10);
        fixture.store.append_message(&old).unwrap();

        let mut first = ChatMessage::new("abc", Role::User, "first new");
        first.created_at = cutoff + Duration::seconds(1);
        fixture.store.append_message(&first).unwrap();

        let mut second = ChatMessage::new("abc", Role::Assistant, "second new");
        second.created_at = cutoff + Duration::seconds(2);
        fixture.store.append_message(&second).unwrap();

        let messages = fixture
            .store
            .messages_since("abc", cutoff, 50)
            .expect("Should list messages");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "first new");
        assert_eq!(messages[1].content, "second new");
    }

    #[tokio::test]
    async fn test_messages_since_keeps_most_recent_up_to_limit() {
        let fixture = TestFixture::new("hi");

        fixture
            .store
            .create_assistant(&create_request("abc"))
            .expect("Should create assistant");

        let base = Utc::now();
        for i in 0..5 {
            let mut message = ChatMessage::new("abc", Role::User, format!("message {}", i));
            message.created_at = base + Duration::seconds(i);
            fixture.store.append_message(&message).unwrap();
        }

        let messages = fixture
            .store
            .messages_since("abc", DateTime::<Utc>::UNIX_EPOCH, 2)
            .expect("Should list messages");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "message 3");
        assert_eq!(messages[1].content, "message 4");
    }
}

// ============================================================================
// AssistantService Tests
// ============================================================================

mod service_tests {
    use super::*;

    #[tokio::test]
    async fn test_post_message_returns_reply_first() {
        let fixture = TestFixture::new("It depends on the function.");

        fixture.service.create("abc", DEFAULT_INSTRUCTIONS).unwrap();

        let state = fixture
            .service
            .post_message("abc", "What should I pass?")
            .await
            .expect("Should post message");

        assert!(state.exists);
        assert_eq!(state.total_messages, 2);
        assert_eq!(state.recent_messages.len(), 2);
        assert_eq!(state.recent_messages[0].role, Role::Assistant);
        assert_eq!(state.recent_messages[0].content, "It depends on the function.");
        assert_eq!(state.recent_messages[1].role, Role::User);
        assert_eq!(state.recent_messages[1].content, "What should I pass?");
    }

    #[tokio::test]
    async fn test_post_message_prompt_includes_instructions_and_history() {
        let fixture = TestFixture::new("ok");

        fixture.service.create("abc", DEFAULT_INSTRUCTIONS).unwrap();
        fixture.service.post_message("abc", "first").await.unwrap();
        fixture.service.post_message("abc", "second").await.unwrap();

        let prompts = fixture.client.recorded_prompts();
        assert_eq!(prompts.len(), 2);

        // First exchange: system prompt plus the user message
        assert_eq!(prompts[0].len(), 2);
        assert_eq!(prompts[0][0].role, Role::System);
        assert_eq!(prompts[0][0].content, DEFAULT_INSTRUCTIONS);
        assert_eq!(prompts[0][1].content, "first");

        // Second exchange sees the stored history
        assert_eq!(prompts[1].len(), 4);
        assert_eq!(prompts[1][1].content, "first");
        assert_eq!(prompts[1][2].content, "ok");
        assert_eq!(prompts[1][3].content, "second");
    }

    #[tokio::test]
    async fn test_post_message_unknown_assistant() {
        let fixture = TestFixture::new("ok");

        let result = fixture.service.post_message("nobody", "hello").await;

        assert!(matches!(result, Err(Error::AssistantNotFound(_))));
    }

    #[tokio::test]
    async fn test_chat_state_unknown_assistant() {
        let fixture = TestFixture::new("ok");

        let state = fixture
            .service
            .chat_state("nobody", None)
            .expect("Should build state envelope");

        assert!(!state.exists);
        assert_eq!(state.total_messages, 0);
        assert!(state.recent_messages.is_empty());
        assert!(state.created_at.is_none());
    }

    #[tokio::test]
    async fn test_chat_state_since_filter() {
        let fixture = TestFixture::new("ok");

        fixture.service.create("abc", DEFAULT_INSTRUCTIONS).unwrap();
        fixture.service.post_message("abc", "early").await.unwrap();

        let cutoff = Utc::now() + Duration::seconds(1);

        let mut late = ChatMessage::new("abc", Role::User, "late");
        late.created_at = cutoff + Duration::seconds(5);
        fixture.store.append_message(&late).unwrap();

        let state = fixture
            .service
            .chat_state("abc", Some(cutoff))
            .expect("Should build state envelope");

        assert!(state.exists);
        assert_eq!(state.total_messages, 3);
        assert_eq!(state.recent_messages.len(), 1);
        assert_eq!(state.recent_messages[0].content, "late");
    }
}

// ============================================================================
// HTTP API Tests
// ============================================================================

mod api_tests {
    use super::*;

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body")
            .to_vec()
    }

    #[tokio::test]
    async fn test_create_assistant_returns_202_with_exact_body() {
        let fixture = TestFixture::new("ok");

        let response = fixture
            .router()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/assistants/abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_bytes(response).await;
        assert_eq!(body, br#"{"assistantId":"abc"}"#);
    }

    #[tokio::test]
    async fn test_post_user_query_returns_plain_text_reply() {
        let fixture = TestFixture::new("Here is your answer.");

        fixture.service.create("abc", DEFAULT_INSTRUCTIONS).unwrap();

        let response = fixture
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/assistants/abc")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"message":"What is the answer?"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/plain"));

        let body = body_bytes(response).await;
        assert_eq!(body, b"Here is your answer.");
    }

    #[tokio::test]
    async fn test_post_user_query_unknown_assistant_returns_404() {
        let fixture = TestFixture::new("ok");

        let response = fixture
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/assistants/nobody")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"message":"hello"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_chat_state_returns_envelope() {
        let fixture = TestFixture::new("reply text");

        fixture.service.create("abc", DEFAULT_INSTRUCTIONS).unwrap();
        fixture.service.post_message("abc", "hello").await.unwrap();

        let response = fixture
            .router()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/assistants/abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("application/json"));

        let body = body_bytes(response).await;
        let state: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(state["id"], "abc");
        assert_eq!(state["exists"], true);
        assert_eq!(state["totalMessages"], 2);
        assert_eq!(state["recentMessages"].as_array().unwrap().len(), 2);
        assert_eq!(state["recentMessages"][0]["role"], "user");
        assert_eq!(state["recentMessages"][1]["role"], "assistant");
        assert_eq!(state["recentMessages"][1]["content"], "reply text");
        assert!(state["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_get_chat_state_unknown_assistant_reports_missing() {
        let fixture = TestFixture::new("ok");

        let response = fixture
            .router()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/assistants/nobody")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_bytes(response).await;
        let state: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(state["exists"], false);
        assert_eq!(state["totalMessages"], 0);
    }

    #[tokio::test]
    async fn test_get_chat_state_timestamp_filters_messages() {
        let fixture = TestFixture::new("ok");

        fixture.service.create("abc", DEFAULT_INSTRUCTIONS).unwrap();

        let mut old = ChatMessage::new("abc", Role::User, "ancient");
        old.created_at = Utc::now() - Duration::days(30);
        fixture.store.append_message(&old).unwrap();

        fixture.service.post_message("abc", "fresh").await.unwrap();

        let cutoff = (Utc::now() - Duration::days(1))
            .to_rfc3339()
            .replace('+', "%2B");
        let response = fixture
            .router()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/assistants/abc?timestampUTC={}", cutoff))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_bytes(response).await;
        let state: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(state["totalMessages"], 3);
        assert_eq!(state["recentMessages"].as_array().unwrap().len(), 2);
        assert_eq!(state["recentMessages"][0]["content"], "fresh");
    }

    #[tokio::test]
    async fn test_get_chat_state_invalid_timestamp_returns_400() {
        let fixture = TestFixture::new("ok");

        fixture.service.create("abc", DEFAULT_INSTRUCTIONS).unwrap();

        let response = fixture
            .router()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/assistants/abc?timestampUTC=yesterday")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let fixture = TestFixture::new("ok");

        let response = fixture
            .router()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_bytes(response).await;
        let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health["status"], "ok");
    }
}
