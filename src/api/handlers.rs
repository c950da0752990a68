//! HTTP request handlers

use super::types::{ClearSessionsResponse, ErrorResponse, HealthResponse, SessionListResponse};
use super::AppState;
use crate::gateway::{GatewayRequest, Reply};
use axum::{
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState, admin_enabled: bool) -> Router {
    let router = Router::new()
        // Gateway webhook
        .route("/ussd", post(ussd_webhook))
        .route("/api/health", get(health));

    let router = if admin_enabled {
        router.route(
            "/admin/ussd/sessions",
            get(list_sessions).delete(clear_sessions),
        )
    } else {
        router
    };

    router.with_state(state)
}

// ============================================================
// Webhook
// ============================================================

/// Always answers 200 with a framed `CON`/`END` body
async fn ussd_webhook(State(state): State<AppState>, request: Request) -> String {
    let request = match parse_gateway_request(request).await {
        Ok(request) => request,
        Err(reason) => {
            tracing::warn!(reason = %reason, "Malformed USSD webhook request");
            return Reply::apology().framed();
        }
    };

    let delivery = state.runtime.handle(&request).await;
    delivery.reply.framed()
}

/// Gateways post form-encoded bodies; JSON is accepted for testing tools
async fn parse_gateway_request(request: Request) -> Result<GatewayRequest, String> {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    if is_json {
        Json::<GatewayRequest>::from_request(request, &())
            .await
            .map(|Json(request)| request)
            .map_err(|e| e.body_text())
    } else {
        Form::<GatewayRequest>::from_request(request, &())
            .await
            .map(|Form(request)| request)
            .map_err(|e| e.body_text())
    }
}

// ============================================================
// Health
// ============================================================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "agriconnect-ussd",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================
// Session Administration
// ============================================================

async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<SessionListResponse>, AppError> {
    let sessions = state
        .runtime
        .sessions()
        .list()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(SessionListResponse {
        count: sessions.len(),
        sessions,
    }))
}

async fn clear_sessions(
    State(state): State<AppState>,
) -> Result<Json<ClearSessionsResponse>, AppError> {
    let cleared = state
        .runtime
        .sessions()
        .clear()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(cleared, "Cleared USSD sessions");
    Ok(Json(ClearSessionsResponse { cleared }))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
