//! API request handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::routes::AppState;
use crate::assistant::DEFAULT_INSTRUCTIONS;
use crate::error::Error;
use crate::types::ChatState;

// Query parameters

#[derive(Debug, Deserialize, IntoParams)]
pub struct ChatStateParams {
    /// Only return messages created at or after this RFC 3339 timestamp
    #[serde(rename = "timestampUTC")]
    pub timestamp_utc: Option<String>,
}

// Request bodies

#[derive(Debug, Deserialize, ToSchema)]
pub struct PostQueryRequest {
    /// User message to send to the assistant
    pub message: String,
}

// Response types

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateAssistantResponse {
    /// Identifier of the created assistant
    #[serde(rename = "assistantId")]
    pub assistant_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// API version
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

// Error mapping

fn error_response(err: Error) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        Error::AssistantNotFound(_) => StatusCode::NOT_FOUND,
        Error::Model(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn bad_request(message: String) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
}

// Handlers

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Create an assistant with the default instructions
#[utoipa::path(
    put,
    path = "/assistants/{assistantId}",
    params(
        ("assistantId" = String, Path, description = "Assistant identifier")
    ),
    responses(
        (status = 202, description = "Assistant created", body = CreateAssistantResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "assistants"
)]
pub async fn create_assistant(
    State(state): State<AppState>,
    Path(assistant_id): Path<String>,
) -> Result<(StatusCode, Json<CreateAssistantResponse>), (StatusCode, Json<ErrorResponse>)> {
    state
        .service
        .create(&assistant_id, DEFAULT_INSTRUCTIONS)
        .map_err(error_response)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateAssistantResponse { assistant_id }),
    ))
}

/// Post a user message and return the assistant reply as plain text
#[utoipa::path(
    post,
    path = "/assistants/{assistantId}",
    params(
        ("assistantId" = String, Path, description = "Assistant identifier")
    ),
    request_body = PostQueryRequest,
    responses(
        (status = 200, description = "Assistant reply", body = String, content_type = "text/plain"),
        (status = 404, description = "Assistant not found", body = ErrorResponse),
        (status = 502, description = "Model backend error", body = ErrorResponse)
    ),
    tag = "assistants"
)]
pub async fn post_user_query(
    State(state): State<AppState>,
    Path(assistant_id): Path<String>,
    Json(req): Json<PostQueryRequest>,
) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    let chat_state = state
        .service
        .post_message(&assistant_id, &req.message)
        .await
        .map_err(error_response)?;

    // The service puts the assistant reply at index 0 of the exchange
    chat_state
        .recent_messages
        .first()
        .map(|message| message.content.clone())
        .ok_or_else(|| error_response(Error::Model("Exchange produced no reply".into())))
}

/// Get the chat state of an assistant
#[utoipa::path(
    get,
    path = "/assistants/{assistantId}",
    params(
        ("assistantId" = String, Path, description = "Assistant identifier"),
        ChatStateParams
    ),
    responses(
        (status = 200, description = "Chat state envelope", body = ChatState),
        (status = 400, description = "Invalid timestamp", body = ErrorResponse)
    ),
    tag = "assistants"
)]
pub async fn get_chat_state(
    State(state): State<AppState>,
    Path(assistant_id): Path<String>,
    Query(params): Query<ChatStateParams>,
) -> Result<Json<ChatState>, (StatusCode, Json<ErrorResponse>)> {
    let since = match params.timestamp_utc.as_deref() {
        Some(raw) => Some(
            raw.parse::<DateTime<Utc>>()
                .map_err(|_| bad_request(format!("Invalid timestampUTC: {}", raw)))?,
        ),
        None => None,
    };

    let chat_state = state
        .service
        .chat_state(&assistant_id, since)
        .map_err(error_response)?;

    Ok(Json(chat_state))
}
