//! HTTP Handlers

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use trade_analyst::{AnalystError, PersonaProfile, QueryType};

use crate::state::AppState;

/// Seconds a client should wait before retrying an LLM outage
const RETRY_AFTER_SECS: &str = "5";

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub trades_loaded: usize,
    pub llm_connected: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub query_type: QueryType,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub kind: String,
    pub message: String,
    pub retryable: bool,
}

/// Error payload plus status
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                kind: "invalid_request".into(),
                message: message.into(),
                retryable: false,
            },
        }
    }
}

impl From<AnalystError> for ApiError {
    fn from(err: AnalystError) -> Self {
        let status = match &err {
            AnalystError::InvalidPlan(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AnalystError::LlmUnavailable { .. } | AnalystError::DataUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        Self {
            status,
            body: ErrorResponse {
                kind: err.kind().into(),
                message: err.user_message(),
                retryable: err.is_retryable(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.body.retryable {
            (
                self.status,
                [(header::RETRY_AFTER, RETRY_AFTER_SECS)],
                Json(self.body),
            )
                .into_response()
        } else {
            (self.status, Json(self.body)).into_response()
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let llm_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        trades_loaded: state.agent.store().len(),
        llm_connected,
    })
}

/// Answer a question about the trade history, in the trader's voice
pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(payload) =
        payload.map_err(|rejection| ApiError::invalid_request(rejection.body_text()))?;

    let message = payload.message.trim();
    if message.is_empty() {
        return Err(ApiError::invalid_request("message must not be empty"));
    }

    let answer = state.agent.answer(message).await.map_err(|e| {
        tracing::error!(kind = e.kind(), "Chat failed: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(ChatResponse {
        response: answer.response,
        query_type: answer.query_type,
    }))
}

/// Persona derived from the trade history; no LLM involved
pub async fn persona_handler(State(state): State<AppState>) -> Json<PersonaProfile> {
    Json(state.agent.persona())
}
