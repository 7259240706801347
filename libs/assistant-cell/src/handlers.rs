// libs/assistant-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Extension, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{AssistantError, AssistantRequest, ChatRequest};
use crate::services::assistant::AssistantService;

/// Admin: run an assistant task over the dashboard snapshot.
///
/// By default the gateway's event stream is proxied through untouched and the
/// console reassembles it; with `stream: false` the text is aggregated here
/// and returned as JSON.
#[axum::debug_handler]
pub async fn run_assistant(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<AssistantRequest>,
) -> Result<Response, AppError> {
    require_admin(&user)?;

    let service = AssistantService::new(&state);

    if request.stream {
        let upstream = service.run(&request).await.map_err(map_assistant_error)?;
        stream_through(upstream)
    } else {
        let text = service
            .run_collected(&request)
            .await
            .map_err(map_assistant_error)?;
        Ok(Json(json!({ "text": text })).into_response())
    }
}

/// Public: one chatbot turn for a site visitor, streamed through.
#[axum::debug_handler]
pub async fn chat(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let service = AssistantService::new(&state);

    let upstream = service.chat(&request).await.map_err(map_assistant_error)?;
    stream_through(upstream)
}

/// Proxy the gateway's chunked body to the caller as an event stream.
fn stream_through(upstream: reqwest::Response) -> Result<Response, AppError> {
    let body = Body::from_stream(upstream.bytes_stream());

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn map_assistant_error(error: AssistantError) -> AppError {
    match error {
        AssistantError::InvalidRequest(msg) => AppError::ValidationError(msg),
        AssistantError::RateLimited => AppError::RateLimited(
            "Limite de requêtes atteinte. Veuillez réessayer dans quelques instants.".to_string(),
        ),
        AssistantError::CreditsExhausted => AppError::PaymentRequired(
            "Crédits IA insuffisants. Veuillez réessayer plus tard.".to_string(),
        ),
        AssistantError::Upstream(msg) => AppError::ExternalService(msg),
        AssistantError::Network(msg) => AppError::ExternalService(msg),
        AssistantError::EmptyCompletion => {
            AppError::ExternalService("Le service IA n'a produit aucun texte".to_string())
        }
    }
}
