//! HTTP endpoints operating on the caller's session.
//!
//! Every handler resolves the session from the request cookie. When the
//! manager had to create the session, the response carries a `Set-Cookie`
//! header issuing its identifier.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use keepsake_session::Payload;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ServerError};
use crate::manager::{Manager, StartedSession};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session manager.
    pub manager: Arc<Manager>,
}

impl AppState {
    /// Create application state around a manager.
    pub fn new(manager: Manager) -> Self {
        Self {
            manager: Arc::new(manager),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Backend name.
    pub backend: String,
    /// Number of live sessions.
    pub sessions: usize,
}

/// Session contents.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Session identifier.
    pub id: String,
    /// Whether this request created the session.
    pub new: bool,
    /// Payload snapshot.
    pub values: Payload,
}

/// Single value lookup.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValueResponse {
    /// Payload key.
    pub key: String,
    /// Value stored under the key.
    pub value: Value,
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/session", get(show_session))
        .route(
            "/session/values/{key}",
            get(get_value).put(put_value).delete(delete_value),
        )
        .route("/session/logout", post(logout))
}

/// Attach the issuing cookie when the session is new.
fn with_session_cookie(
    state: &AppState,
    started: &StartedSession,
    response: impl IntoResponse,
) -> Result<Response> {
    let mut response = response.into_response();
    if started.is_new {
        let cookie = state.manager.session_cookie(started.id())?;
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    Ok(response)
}

/// Service health and live session count.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        backend: state.manager.backend().to_string(),
        sessions: state.manager.store().len(),
    })
}

/// Show the caller's session, starting one if needed.
pub async fn show_session(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let started = state.manager.start_from_headers(&headers)?;
    let body = SessionResponse {
        id: started.id().to_string(),
        new: started.is_new,
        values: started.session.values(),
    };
    with_session_cookie(&state, &started, Json(body))
}

/// Read one value from the caller's session.
pub async fn get_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let started = state.manager.start_from_headers(&headers)?;
    let value = started
        .session
        .get(&key)
        .ok_or_else(|| ServerError::NotFound(format!("session key '{}'", key)))?;
    with_session_cookie(&state, &started, Json(ValueResponse { key, value }))
}

/// Store one value in the caller's session.
pub async fn put_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    Json(value): Json<Value>,
) -> Result<Response> {
    let started = state.manager.start_from_headers(&headers)?;
    started.session.set(key, value);
    with_session_cookie(&state, &started, StatusCode::NO_CONTENT)
}

/// Remove one value from the caller's session.
pub async fn delete_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let started = state.manager.start_from_headers(&headers)?;
    started.session.delete(&key);
    with_session_cookie(&state, &started, StatusCode::NO_CONTENT)
}

/// End the caller's session and drop its cookie.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let mut response = StatusCode::NO_CONTENT.into_response();
    if state.manager.end_from_headers(&headers)?.is_some() {
        let cookie = state.manager.expired_cookie()?;
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    Ok(response)
}
