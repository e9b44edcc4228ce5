//! Plain HTTP/JSON API mirroring the MCP tools.
//!
//! Every endpoint answers with `{"result": [<report text>]}`. Rejected
//! input is still a 200: the report text carries the reason. Storage
//! faults map to 500, unknown tools to 404, undecodable tool arguments to
//! 400. Error bodies are `{"detail": "..."}`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use registrar_common::report::{add_report, list_report, search_report};
use registrar_common::{RegistrationError, ToolError, tool_definitions};

use crate::state::AppState;
use crate::tools::AddRegistrationInput;

/// Success body shared by all report endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub result: Vec<String>,
}

impl ReportResponse {
    fn single(text: String) -> Json<Self> {
        Json(Self { result: vec![text] })
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct ToolCallRequest {
    #[serde(default)]
    pub arguments: Value,
}

/// Error response rendered as `{"detail": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn internal(context: &str, err: &anyhow::Error) -> Self {
        tracing::error!(error = %format!("{err:#}"), "{context}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{context}: {err:#}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// Turn a store outcome into a report, or a 500 when storage failed.
fn reported<T>(
    context: &str,
    outcome: &Result<T, RegistrationError>,
    report: String,
) -> Result<Json<ReportResponse>, ApiError> {
    match outcome {
        Err(e) if !e.is_user_correctable() => {
            tracing::error!(error = %e, "{context}");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{context}: {e}"),
            ))
        }
        _ => Ok(ReportResponse::single(report)),
    }
}

// ===================================================================
// Handlers
// ===================================================================

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Registration API",
        "endpoints": {
            "add_registration": "POST /add_registration",
            "get_all_registrations": "GET /get_all_registrations",
            "search_registrations": "GET /search_registrations?query=",
            "tools": "GET /tools",
            "call_tool": "POST /tools/{name}/call",
            "mcp": "/mcp",
            "health": "GET /health"
        }
    }))
}

/// Health-check handler for load-balancer probes.
async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "Registration API" }))
}

async fn add_registration(
    State(state): State<Arc<AppState>>,
    Json(input): Json<AddRegistrationInput>,
) -> Result<Json<ReportResponse>, ApiError> {
    let outcome = state
        .add(input.name, input.email, input.dob)
        .await
        .map_err(|e| ApiError::internal("Registration failed", &e))?;
    reported("Registration failed", &outcome, add_report(&outcome))
}

async fn get_all_registrations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReportResponse>, ApiError> {
    let outcome = state
        .list()
        .await
        .map_err(|e| ApiError::internal("Failed to fetch registrations", &e))?;
    reported(
        "Failed to fetch registrations",
        &outcome,
        list_report(&outcome),
    )
}

async fn search_registrations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ReportResponse>, ApiError> {
    let outcome = state
        .search(params.query.clone())
        .await
        .map_err(|e| ApiError::internal("Search failed", &e))?;
    reported(
        "Search failed",
        &outcome,
        search_report(&params.query, &outcome),
    )
}

async fn list_tools() -> Json<Value> {
    Json(tool_definitions())
}

async fn call_tool(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<ToolCallRequest>,
) -> Result<Json<ReportResponse>, ApiError> {
    let outcome = state
        .call_tool(name, request.arguments)
        .await
        .map_err(|e| ApiError::internal("Tool call failed", &e))?;
    match outcome {
        Ok(text) => Ok(ReportResponse::single(text)),
        Err(e @ ToolError::UnknownTool(_)) => Err(ApiError::new(StatusCode::NOT_FOUND, e.to_string())),
        Err(e @ ToolError::InvalidArguments { .. }) => {
            Err(ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))
        }
    }
}

/// Routes of the JSON API (the MCP service is nested by the caller).
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/add_registration", post(add_registration))
        .route("/get_all_registrations", get(get_all_registrations))
        .route("/search_registrations", get(search_registrations))
        .route("/tools", get(list_tools))
        .route("/tools/{name}/call", post(call_tool))
        .with_state(state)
}
