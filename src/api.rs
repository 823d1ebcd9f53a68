//! HTTP surface for Medbrief.
//!
//! A compact Axum router over [`MedbriefApi`]:
//!
//! - `GET /health` – Liveness.
//! - `GET /health/generation` – Send a short probe prompt to the generation provider.
//! - `POST /api/analysis` – Extract, aggregate and summarize stored uploads. The aggregated
//!   context stays server-side and is never part of a response.
//! - `GET|DELETE /api/analysis/{id}` – Fetch or drop a stored analysis.
//! - `POST /api/chat` – Ask a follow-up question grounded on an analysis or inline context.
//! - `GET|DELETE /api/chat/{id}`, `DELETE /api/chat` – Conversation history and cleanup.
//! - `GET /metrics` – Counters.
//! - `GET /commands` – Machine-readable command catalog.

use crate::extraction::{DocumentOutcome, SourceFile};
use crate::generation::{GenerationError, GenerationHealth};
use crate::pipeline::{ChatReply, ChatRequest, ConversationView, MedbriefApi, ServiceError};
use crate::store::{AnalysisRecord, current_timestamp_rfc3339};
use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{FromRequest, Path, Request, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the analysis and chat API.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: MedbriefApi + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/health/generation", get(generation_health::<S>))
        .route("/api/analysis", post(analyze::<S>))
        .route(
            "/api/analysis/:id",
            get(get_analysis::<S>).delete(delete_analysis::<S>),
        )
        .route(
            "/api/chat",
            post(chat::<S>).delete(clear_conversations::<S>),
        )
        .route(
            "/api/chat/:id",
            get(get_conversation::<S>).delete(delete_conversation::<S>),
        )
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    timestamp: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Medbrief backend is running",
        timestamp: current_timestamp_rfc3339(),
    })
}

async fn generation_health<S>(State(service): State<Arc<S>>) -> (StatusCode, Json<GenerationHealth>)
where
    S: MedbriefApi,
{
    let health = service.generation_health().await;
    let status = if health.reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health))
}

/// Request body for `POST /api/analysis`.
#[derive(Deserialize)]
struct AnalysisRequest {
    /// Stored uploads, each with its path and the name the client uploaded it under.
    #[serde(default)]
    files: Vec<SourceFile>,
}

/// Analysis as returned to clients: everything but the aggregated context.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisResponse {
    id: String,
    timestamp: String,
    files_analyzed: usize,
    successfully_parsed: usize,
    summary: String,
    context_tokens: usize,
    documents: Vec<DocumentOutcome>,
}

impl From<&AnalysisRecord> for AnalysisResponse {
    fn from(record: &AnalysisRecord) -> Self {
        Self {
            id: record.id.clone(),
            timestamp: record.timestamp.clone(),
            files_analyzed: record.requested_count,
            successfully_parsed: record.succeeded_count,
            summary: record.summary.clone(),
            context_tokens: record.context_tokens,
            documents: record.documents.clone(),
        }
    }
}

/// Analyze uploaded documents and return the stored analysis.
async fn analyze<S>(
    State(service): State<Arc<S>>,
    ApiJson(request): ApiJson<AnalysisRequest>,
) -> Result<Json<AnalysisResponse>, AppError>
where
    S: MedbriefApi,
{
    let record = service.analyze(request.files).await?;
    Ok(Json(AnalysisResponse::from(record.as_ref())))
}

async fn get_analysis<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisResponse>, AppError>
where
    S: MedbriefApi,
{
    let record = service.get_analysis(&id)?;
    Ok(Json(AnalysisResponse::from(record.as_ref())))
}

async fn delete_analysis<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: MedbriefApi,
{
    service.delete_analysis(&id)?;
    Ok(Json(json!({
        "message": "Analysis deleted successfully",
        "id": id,
    })))
}

/// Answer a follow-up question and append the turn to its conversation.
async fn chat<S>(
    State(service): State<Arc<S>>,
    ApiJson(request): ApiJson<ChatRequest>,
) -> Result<Json<ChatReply>, AppError>
where
    S: MedbriefApi,
{
    Ok(Json(service.chat(request).await?))
}

async fn get_conversation<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<ConversationView>, AppError>
where
    S: MedbriefApi,
{
    Ok(Json(service.get_conversation(&id).await?))
}

async fn delete_conversation<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: MedbriefApi,
{
    service.delete_conversation(&id)?;
    Ok(Json(json!({
        "message": "Conversation deleted successfully",
        "conversationId": id,
    })))
}

async fn clear_conversations<S>(State(service): State<Arc<S>>) -> Json<serde_json::Value>
where
    S: MedbriefApi,
{
    let count = service.clear_conversations();
    Json(json!({
        "message": "All conversations cleared",
        "count": count,
    }))
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: MedbriefApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "analyze",
                method: "POST",
                path: "/api/analysis",
                description: "Extract text from stored uploads (PDF, DOCX, DOC, TXT), combine it into one context and generate a three-section medical summary. Returns per-document outcomes; the context itself is kept server-side.",
                request_example: Some(json!({
                    "files": [
                        { "path": "/srv/uploads/4f1c.pdf", "originalName": "report.pdf" },
                        { "path": "/srv/uploads/9a2e.txt", "originalName": "notes.txt" }
                    ]
                })),
            },
            CommandDescriptor {
                name: "get_analysis",
                method: "GET",
                path: "/api/analysis/{id}",
                description: "Return a stored analysis without its aggregated context.",
                request_example: None,
            },
            CommandDescriptor {
                name: "delete_analysis",
                method: "DELETE",
                path: "/api/analysis/{id}",
                description: "Delete a stored analysis.",
                request_example: None,
            },
            CommandDescriptor {
                name: "chat",
                method: "POST",
                path: "/api/chat",
                description: "Ask a follow-up question. Context comes from analysisId, or from medicalContext when no analysis id is given. Omit conversationId to start a new conversation.",
                request_example: Some(json!({
                    "message": "Which medications is the patient on?",
                    "analysisId": "3b0f6a2e-8c1d-4d3e-9b7a-1f2e3d4c5b6a",
                    "conversationId": null
                })),
            },
            CommandDescriptor {
                name: "get_conversation",
                method: "GET",
                path: "/api/chat/{id}",
                description: "Return a conversation's turns, oldest first.",
                request_example: None,
            },
            CommandDescriptor {
                name: "delete_conversation",
                method: "DELETE",
                path: "/api/chat/{id}",
                description: "Delete one conversation.",
                request_example: None,
            },
            CommandDescriptor {
                name: "clear_conversations",
                method: "DELETE",
                path: "/api/chat",
                description: "Delete every conversation and report how many were removed.",
                request_example: None,
            },
            CommandDescriptor {
                name: "generation_health",
                method: "GET",
                path: "/health/generation",
                description: "Probe the configured generation provider with a short prompt.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return analysis, extraction and chat counters.",
                request_example: None,
            },
        ],
    })
}

/// JSON body extractor whose rejections come back as `InvalidInput` errors.
struct ApiJson<T>(T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(request, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::from(rejection)),
        }
    }
}

struct AppError(ServiceError);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ServiceError::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        let (status, body) = match self.0 {
            ServiceError::InvalidInput(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid input", "message": message }),
            ),
            ServiceError::AggregateEmpty { documents } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": "No content extracted",
                    "message": message,
                    "documents": documents,
                }),
            ),
            ServiceError::Generation(GenerationError::Timeout(_)) => (
                StatusCode::GATEWAY_TIMEOUT,
                json!({ "error": "Generation timed out", "message": message }),
            ),
            ServiceError::Generation(_) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "Generation failed", "message": message }),
            ),
            ServiceError::NotFound(not_found) => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": format!("{} not found", not_found.kind),
                    "message": message,
                }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(inner: ServiceError) -> Self {
        Self(inner)
    }
}
