//! API route definitions

use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    self, CreateAssistantResponse, ErrorResponse, HealthResponse, PostQueryRequest,
};
use crate::assistant::AssistantService;
use crate::types::{ChatMessage, ChatState, Role};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Concierge API",
        version = "0.1.0",
        description = "Self-hosted assistant chat service with an OpenAI-compatible backend"
    ),
    tags(
        (name = "assistants", description = "Assistant lifecycle and chat"),
        (name = "health", description = "Health checks")
    ),
    paths(
        handlers::health,
        handlers::create_assistant,
        handlers::post_user_query,
        handlers::get_chat_state,
    ),
    components(schemas(
        Role,
        ChatMessage,
        ChatState,
        CreateAssistantResponse,
        PostQueryRequest,
        HealthResponse,
        ErrorResponse,
    ))
)]
pub struct ApiDoc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AssistantService>,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let openapi = ApiDoc::openapi();

    Router::new()
        // Assistant lifecycle and chat
        .route("/assistants/{assistantId}", put(handlers::create_assistant))
        .route("/assistants/{assistantId}", post(handlers::post_user_query))
        .route("/assistants/{assistantId}", get(handlers::get_chat_state))

        // Health
        .route("/health", get(handlers::health))

        // OpenAPI spec and Swagger UI
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", openapi))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
