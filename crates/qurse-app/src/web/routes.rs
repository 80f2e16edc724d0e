use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use futures::StreamExt;

use qurse_chat::{ChatService, GenerationError};

use crate::web::protocol::{ChatCompletionRequest, ChatCompletionResponse, ModelListResponse};

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ChatService>,
}

/// Create router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/models", get(list_models))
        .route("/health", get(health))
        .with_state(state)
}

/// GET /health - liveness probe
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /v1/models - the enabled registry, grouped by provider
async fn list_models(State(state): State<AppState>) -> Json<ModelListResponse> {
    Json(ModelListResponse::from_registry(state.service.registry()))
}

/// POST /v1/chat/completions - plain, streaming, or tool-augmented chat
async fn chat_completions(
    State(state): State<AppState>,
    Json(payload): Json<ChatCompletionRequest>,
) -> Result<Response, AppError> {
    let request = payload.to_generation_request();

    // Side-channel data (reasoning, sources) cannot travel the plain token
    // stream, so the tool path always answers with the terminal envelope
    if payload.stream && !request.tools_enabled {
        let stream = state.service.generate_streaming(&request).await?;

        let events = stream.map(|item| -> Result<Event, Infallible> {
            match item {
                Ok(chunk) => {
                    let mut delta = serde_json::Map::new();
                    if !chunk.delta.is_empty() {
                        delta.insert("content".to_string(), chunk.delta.into());
                    }
                    if let Some(reasoning) = chunk.reasoning_delta {
                        delta.insert("reasoning".to_string(), reasoning.into());
                    }
                    let payload = serde_json::json!({
                        "choices": [{
                            "delta": delta,
                            "finish_reason": chunk.finish_reason,
                        }]
                    });
                    Ok(Event::default().data(payload.to_string()))
                }
                Err(e) => {
                    let payload = serde_json::json!({ "error": e.to_string() });
                    Ok(Event::default().event("error").data(payload.to_string()))
                }
            }
        });
        let done = futures::stream::once(async {
            Ok::<Event, Infallible>(Event::default().data("[DONE]"))
        });

        return Ok(Sse::new(events.chain(done)).into_response());
    }

    let result = state.service.generate(&request).await?;
    Ok(Json(ChatCompletionResponse::from_result(&payload.model, result)).into_response())
}

/// Route-level error with HTTP status mapping
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Upstream(String),
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::ModelNotAvailable(model) => {
                AppError::BadRequest(format!("model not available: {}", model))
            }
            GenerationError::Provider(e) => AppError::Upstream(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::Upstream(message) => (StatusCode::BAD_GATEWAY, message),
        };
        (
            status,
            Json(serde_json::json!({ "error": { "message": message } })),
        )
            .into_response()
    }
}
