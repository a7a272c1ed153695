//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for document upload, question answering, and
//! conversation memory. A single conversation session lives for the lifetime
//! of the server process.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::LeseError;
use crate::pipeline::{Pipeline, UploadedFile};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Uploads larger than this are rejected.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared application state.
struct AppState {
    pipeline: Pipeline,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(settings)?;

    let state = Arc::new(AppState { pipeline });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/chat", post(chat))
        .route("/memory", get(memory_show).delete(memory_clear))
        .route("/memory/recent", get(memory_recent))
        .route("/memory/search", get(memory_search))
        .route("/documents", get(list_documents))
        .route("/reset", post(reset))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Lese API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Upload", "POST   /upload");
    Output::kv("Chat (RAG)", "POST   /chat");
    Output::kv("Memory", "GET    /memory");
    Output::kv("Recent", "GET    /memory/recent?n=5");
    Output::kv("Search memory", "GET    /memory/search?q=...");
    Output::kv("Clear memory", "DELETE /memory");
    Output::kv("Documents", "GET    /documents");
    Output::kv("Reset", "POST   /reset");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Serialize)]
struct UploadResponse {
    message: String,
    processed_files: Vec<String>,
    total_chunks: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    answer: String,
    sources: Vec<String>,
    num_sources: usize,
    memory_length: usize,
}

#[derive(Deserialize)]
struct RecentParams {
    #[serde(default = "default_recent_n")]
    n: usize,
}

fn default_recent_n() -> usize {
    5
}

#[derive(Deserialize)]
struct SearchParams {
    q: String,
}

#[derive(Serialize)]
struct MemoryResponse {
    exchanges: Vec<crate::memory::Exchange>,
    total: usize,
}

#[derive(Serialize)]
struct DocumentListResponse {
    documents: Vec<DocumentInfo>,
    total: usize,
}

#[derive(Serialize)]
struct DocumentInfo {
    source_document: String,
    chunk_count: u32,
    indexed_at: String,
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Map domain errors to HTTP status codes.
fn error_status(err: &LeseError) -> StatusCode {
    match err {
        LeseError::EmptyIndex
        | LeseError::InvalidInput(_)
        | LeseError::UnsupportedFormat(_)
        | LeseError::Ingestion(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: LeseError) -> axum::response::Response {
    (
        error_status(&err),
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let memory = state.pipeline.memory_summary().ok();
    Json(serde_json::json!({ "status": "ok", "memory": memory }))
}

async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut files = Vec::new();

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = match field.file_name() {
                    Some(n) => n.to_string(),
                    None => {
                        return error_response(LeseError::InvalidInput(
                            "multipart field is missing a file name".to_string(),
                        ))
                    }
                };

                match field.bytes().await {
                    Ok(bytes) => files.push(UploadedFile {
                        name,
                        bytes: bytes.to_vec(),
                    }),
                    Err(e) => {
                        return error_response(LeseError::InvalidInput(format!(
                            "failed to read upload: {}",
                            e
                        )))
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return error_response(LeseError::InvalidInput(format!(
                    "invalid multipart body: {}",
                    e
                )))
            }
        }
    }

    match state.pipeline.ingest_files(&files).await {
        Ok(report) => Json(UploadResponse {
            message: format!(
                "Indexed {} chunks from {} document(s)",
                report.chunks_indexed,
                report.processed_files.len()
            ),
            processed_files: report.processed_files,
            total_chunks: report.chunks_indexed,
            errors: report.errors,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    if req.message.trim().is_empty() {
        return error_response(LeseError::InvalidInput(
            "message must not be empty".to_string(),
        ));
    }

    match state.pipeline.ask(&req.message).await {
        Ok(result) => Json(ChatResponse {
            answer: result.answer,
            num_sources: result.sources.len(),
            sources: result.sources,
            memory_length: result.memory_length,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn memory_show(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.pipeline.memory_all() {
        Ok(exchanges) => Json(MemoryResponse {
            total: exchanges.len(),
            exchanges,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn memory_recent(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentParams>,
) -> impl IntoResponse {
    match state.pipeline.memory_recent(params.n) {
        Ok(exchanges) => Json(MemoryResponse {
            total: exchanges.len(),
            exchanges,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn memory_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    match state.pipeline.memory_search(&params.q) {
        Ok(exchanges) => Json(MemoryResponse {
            total: exchanges.len(),
            exchanges,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn memory_clear(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.pipeline.memory_clear() {
        Ok(()) => Json(StatusResponse {
            status: "memory cleared".to_string(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_documents(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.pipeline.list_documents().await {
        Ok(documents) => Json(DocumentListResponse {
            total: documents.len(),
            documents: documents
                .into_iter()
                .map(|d| DocumentInfo {
                    source_document: d.source_document,
                    chunk_count: d.chunk_count,
                    indexed_at: d.indexed_at.to_rfc3339(),
                })
                .collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn reset(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.pipeline.reset().await {
        Ok(()) => Json(StatusResponse {
            status: "index and memory cleared".to_string(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(error_status(&LeseError::EmptyIndex), StatusCode::BAD_REQUEST);
        assert_eq!(
            error_status(&LeseError::InvalidInput("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&LeseError::Generation("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
