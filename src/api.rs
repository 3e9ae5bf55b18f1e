//! REST API server for the voice ledger
//!
//! Exposes statement capture, questions and record listing over HTTP.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::assistant::VoiceLedger;
use crate::error::LedgerError;
use crate::models::RecordType;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct TranscriptionRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn ok<T: Serialize>(data: T) -> ApiResult {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

fn failure(err: LedgerError) -> ApiResult {
    let status = match &err {
        LedgerError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::InvalidRecord(_) => StatusCode::BAD_REQUEST,
        LedgerError::TranscriptionError(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %err, "Request failed");
    }
    (status, Json(ApiResponse::error(err.to_string())))
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub ledger: Arc<VoiceLedger>,
}

/// =============================
/// Endpoints
/// =============================

async fn index(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "voice-ledger",
        "transcription": state.ledger.can_transcribe(),
        "endpoints": [
            "GET /health",
            "POST /transcribe",
            "POST /transcribe-text",
            "POST /query",
            "GET /records",
            "GET /records/:record_type"
        ]
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Raw audio body; content type taken from the request header
async fn transcribe_audio(State(state): State<ApiState>, headers: HeaderMap, body: Bytes) -> ApiResult {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    info!(bytes = body.len(), %content_type, "Received audio statement");

    match state.ledger.process_audio(body.to_vec(), &content_type).await {
        Ok(processed) => ok(processed),
        Err(e) => failure(e),
    }
}

async fn transcribe_text(
    State(state): State<ApiState>,
    Json(req): Json<TranscriptionRequest>,
) -> ApiResult {
    info!("Received text statement: {}", req.text);

    match state.ledger.process_transcription(&req.text).await {
        Ok(processed) => ok(processed),
        Err(e) => failure(e),
    }
}

async fn query(State(state): State<ApiState>, Json(req): Json<QueryRequest>) -> ApiResult {
    info!("Received question: {}", req.query);

    match state.ledger.answer_query(&req.query).await {
        Ok(answer) => ok(answer),
        Err(e) => failure(e),
    }
}

async fn list_records(State(state): State<ApiState>) -> ApiResult {
    match state.ledger.records().await {
        Ok(records) => ok(records),
        Err(e) => failure(e),
    }
}

async fn list_records_of_type(
    State(state): State<ApiState>,
    Path(record_type): Path<String>,
) -> ApiResult {
    let record_type: RecordType = match record_type.parse() {
        Ok(t) => t,
        Err(e) => return failure(e),
    };

    match state.ledger.records_of_type(record_type).await {
        Ok(records) => ok(records),
        Err(e) => failure(e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(ledger: Arc<VoiceLedger>) -> Router {
    let state = ApiState { ledger };

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/transcribe", post(transcribe_audio))
        .route("/transcribe-text", post(transcribe_text))
        .route("/query", post(query))
        .route("/records", get(list_records))
        .route("/records/:record_type", get(list_records_of_type))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    ledger: Arc<VoiceLedger>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(ledger);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
