//! HTTP Endpoints (§6 External Interfaces)
//!
//! `POST /chat/stream` (SSE), `POST /query` (JSON), `GET /health`.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::{
    extract::{Json, State},
    http::{HeaderValue, Method, StatusCode},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use tokio_stream::StreamExt;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use docqa_core::query::FilterValue;
use docqa_core::runtime_context::RuntimeContext;
use docqa_core::query::QueryRequest;
use docqa_orchestrator::{AskOutcome, CancellationToken};

use crate::metrics::metrics_handler;
use crate::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let config = state.config.read();
    let cors_layer = build_cors_layer(&config.server.cors_origins, config.server.cors_enabled);
    drop(config);

    Router::new()
        .route("/chat/stream", post(chat_stream))
        .route("/query", post(query))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    if origins.is_empty() {
        tracing::info!("No CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any);
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::error!("all configured CORS origins are invalid, falling back to localhost");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any);
    }

    tracing::info!(count = parsed_origins.len(), "CORS configured");
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_credentials(true)
}

/// Shared request body for `/chat/stream` and `/query` (§6).
#[derive(Debug, Deserialize)]
struct ChatRequestBody {
    query: String,
    thread_id: Option<String>,
    #[serde(default)]
    filters: HashMap<String, FilterValue>,
    #[serde(default)]
    context: RuntimeContext,
    top_k: Option<usize>,
}

impl ChatRequestBody {
    fn into_query_request(self) -> QueryRequest {
        QueryRequest {
            query_text: self.query,
            thread_id: self.thread_id,
            filters: self.filters,
            runtime_context: self.context,
            top_k: self.top_k,
        }
    }
}

/// `POST /chat/stream`: one `data:` line of JSON per pipeline event (§4.11).
async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequestBody>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let query_request = request.into_query_request();
    let cancellation = CancellationToken::new();
    let events = state.runtime.stream(query_request, cancellation);

    let frames = events.map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to serialize event, dropping frame");
            "{}".to_string()
        });
        Ok(SseEvent::default().data(data))
    });

    Sse::new(frames).keep_alive(KeepAlive::default())
}

/// `POST /query`: non-streaming variant, buffers events and returns the
/// terminal payload. HTTP 200 even on pipeline-internal failure (§7); only
/// malformed request bodies produce 4xx, handled by the `Json` extractor.
async fn query(
    State(state): State<AppState>,
    Json(request): Json<ChatRequestBody>,
) -> (StatusCode, Json<serde_json::Value>) {
    let query_request = request.into_query_request();
    let cancellation = CancellationToken::new();

    match state.runtime.ask(query_request, cancellation).await {
        AskOutcome::Generated(result) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "answer": result.answer,
                "sources": result.sources,
                "query": result.query,
                "retries": result.retries,
                "context_metadata": result.context_metadata,
            })),
        ),
        AskOutcome::Failed { category, message } => (
            StatusCode::OK,
            Json(serde_json::json!({
                "error": { "category": category, "message": message },
            })),
        ),
    }
}

/// `GET /health`: `{status, vector_backend, object_store, collection_info}` (§6).
/// `object_store` is always `false` (ingestion/object storage is out of
/// scope for this service, §4 Non-goals).
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let health = state.runtime.retriever_health().await;
    let status_code = if health.vector_backend { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status_code,
        Json(serde_json::json!({
            "status": if health.vector_backend { "healthy" } else { "degraded" },
            "vector_backend": health.vector_backend,
            "object_store": false,
            "collection_info": {
                "name": health.collection_name,
                "points_count": health.collection_points,
            },
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_body_maps_onto_query_request() {
        let body = ChatRequestBody {
            query: "what is the warranty".to_string(),
            thread_id: Some("t-1".to_string()),
            filters: HashMap::new(),
            context: RuntimeContext::default(),
            top_k: Some(5),
        };
        let request = body.into_query_request();
        assert_eq!(request.query_text, "what is the warranty");
        assert_eq!(request.thread_id.as_deref(), Some("t-1"));
        assert_eq!(request.top_k, Some(5));
    }
}
