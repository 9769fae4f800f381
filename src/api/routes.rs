use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::{JsonBody, error::ApiResult};
use crate::AppState;
use crate::session::{Message, SessionSummary};

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/api/send", post(send_message))
        .route("/api/messages", post(list_messages))
        .route("/api/sessions", get(list_sessions))
        .route("/api/rename-session", post(rename_session))
        .route("/api/delete-session", post(delete_session))
        .route("/ping", get(ping))
}

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response DTOs
// ─────────────────────────────────────────────────────────────────────────────

// Absent or null fields reach the store as empty strings and are reported as missing.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest {
    sender: Option<String>,
    text: Option<String>,
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest {
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameRequest {
    session_id: Option<String>,
    new_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct Ack {
    success: bool,
}

#[derive(Debug, Serialize)]
struct Confirmation {
    success: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct MessagesResponse {
    success: bool,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct SessionsResponse {
    success: bool,
    sessions: Vec<SessionSummary>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/send - Append a message, creating the session if needed.
async fn send_message(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SendRequest>,
) -> ApiResult<Json<Ack>> {
    state.sessions.append_message(
        req.session_id.unwrap_or_default(),
        req.sender.unwrap_or_default(),
        req.text.unwrap_or_default(),
    )?;
    Ok(Json(Ack { success: true }))
}

/// POST /api/messages - Messages of one session, oldest first.
async fn list_messages(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SessionRequest>,
) -> ApiResult<Json<MessagesResponse>> {
    let messages = state
        .sessions
        .list_messages(req.session_id.as_deref().unwrap_or_default())?;
    Ok(Json(MessagesResponse {
        success: true,
        messages,
    }))
}

/// GET /api/sessions - All sessions, most recently active first.
async fn list_sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    Json(SessionsResponse {
        success: true,
        sessions: state.sessions.list_sessions(),
    })
}

/// POST /api/rename-session - Set a session's display name.
async fn rename_session(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RenameRequest>,
) -> ApiResult<Json<Confirmation>> {
    state.sessions.rename_session(
        req.session_id.as_deref().unwrap_or_default(),
        req.new_name.unwrap_or_default(),
    )?;
    Ok(Json(Confirmation {
        success: true,
        message: "Session renamed successfully".to_string(),
    }))
}

/// POST /api/delete-session - Remove a session and its messages.
async fn delete_session(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SessionRequest>,
) -> ApiResult<Json<Confirmation>> {
    state
        .sessions
        .delete_session(req.session_id.as_deref().unwrap_or_default())?;
    Ok(Json(Confirmation {
        success: true,
        message: "Session deleted successfully".to_string(),
    }))
}

/// GET /ping - Liveness check.
async fn ping() -> &'static str {
    "pong"
}
