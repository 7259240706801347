// libs/lead-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{
    CallNotes, LeadError, QuoteSearchQuery, SetClientStageRequest, SubmitQuoteRequest,
    UpdateQuoteStatusRequest,
};
use crate::services::notes::{visible_sections, CallNotesService, DraftSessions};
use crate::services::quotes::QuoteService;

/// Router state: the config plus the registry of open note drafts, whose
/// autosave tasks outlive individual requests.
#[derive(Clone)]
pub struct LeadState {
    pub config: Arc<AppConfig>,
    pub drafts: Arc<DraftSessions>,
}

impl LeadState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            drafts: Arc::new(DraftSessions::new()),
        }
    }
}

// ==============================================================================
// QUOTE REQUESTS
// ==============================================================================

/// Public: quote request form submission.
#[axum::debug_handler]
pub async fn submit_quote(
    State(state): State<LeadState>,
    Json(request): Json<SubmitQuoteRequest>,
) -> Result<Json<Value>, AppError> {
    let service = QuoteService::new(&state.config);

    let quote = service.submit_quote(request).await.map_err(map_lead_error)?;

    Ok(Json(json!({
        "success": true,
        "quote": quote,
    })))
}

/// Admin: list quote requests with optional status filter and text search.
#[axum::debug_handler]
pub async fn list_quotes(
    State(state): State<LeadState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<QuoteSearchQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = QuoteService::new(&state.config);
    let quotes = service
        .list_quotes(&query, auth.token())
        .await
        .map_err(map_lead_error)?;

    let count = quotes.len();
    Ok(Json(json!({
        "quotes": quotes,
        "count": count,
    })))
}

#[axum::debug_handler]
pub async fn update_quote_status(
    State(state): State<LeadState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(quote_id): Path<Uuid>,
    Json(request): Json<UpdateQuoteStatusRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = QuoteService::new(&state.config);
    let quote = service
        .update_status(quote_id, request.status, auth.token())
        .await
        .map_err(map_lead_error)?;

    Ok(Json(json!({
        "success": true,
        "quote": quote,
    })))
}

#[axum::debug_handler]
pub async fn delete_quote(
    State(state): State<LeadState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(quote_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = QuoteService::new(&state.config);
    service
        .delete_quote(quote_id, auth.token())
        .await
        .map_err(map_lead_error)?;

    Ok(Json(json!({ "success": true })))
}

/// Admin: which contact-sheet sections apply to a quote, derived from its
/// declared services.
#[axum::debug_handler]
pub async fn get_quote_sections(
    State(state): State<LeadState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(quote_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = QuoteService::new(&state.config);
    let quote = service
        .get_quote(quote_id, auth.token())
        .await
        .map_err(map_lead_error)?;

    Ok(Json(json!({
        "quote_id": quote.id,
        "sections": visible_sections(&quote.services),
    })))
}

// ==============================================================================
// CLIENT PIPELINE
// ==============================================================================

#[axum::debug_handler]
pub async fn list_clients(
    State(state): State<LeadState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = QuoteService::new(&state.config);
    let clients = service
        .list_clients(auth.token())
        .await
        .map_err(map_lead_error)?;

    let count = clients.len();
    Ok(Json(json!({
        "clients": clients,
        "count": count,
    })))
}

#[axum::debug_handler]
pub async fn set_client_stage(
    State(state): State<LeadState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(client_email): Path<String>,
    Json(request): Json<SetClientStageRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = QuoteService::new(&state.config);
    let client = service
        .set_client_stage(&client_email, request.status, request.notes, auth.token())
        .await
        .map_err(map_lead_error)?;

    Ok(Json(json!({
        "success": true,
        "client": client,
    })))
}

// ==============================================================================
// CALL NOTES
// ==============================================================================

#[axum::debug_handler]
pub async fn get_call_notes(
    State(state): State<LeadState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(call_booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = CallNotesService::new(&state.config);
    let notes = service
        .get_notes(call_booking_id, auth.token())
        .await
        .map_err(map_lead_error)?;

    let exists = notes.is_some();
    Ok(Json(json!({
        "notes": notes.unwrap_or_else(|| CallNotes::empty(call_booking_id)),
        "exists": exists,
    })))
}

#[axum::debug_handler]
pub async fn save_call_notes(
    State(state): State<LeadState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(call_booking_id): Path<Uuid>,
    Json(mut notes): Json<CallNotes>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    // The path, not the body, decides which booking the notes belong to
    notes.call_booking_id = call_booking_id;

    let service = CallNotesService::new(&state.config);
    let saved = service
        .save_notes(&notes, auth.token())
        .await
        .map_err(map_lead_error)?;

    Ok(Json(json!({
        "success": true,
        "notes": saved,
    })))
}

/// Admin: record the latest draft while the notes view is open. The first
/// write opens an autosave session for the booking.
#[axum::debug_handler]
pub async fn update_notes_draft(
    State(state): State<LeadState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(call_booking_id): Path<Uuid>,
    Json(mut notes): Json<CallNotes>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    notes.call_booking_id = call_booking_id;

    let service = Arc::new(CallNotesService::new(&state.config));
    state.drafts.update(service, auth.token(), notes);

    Ok(Json(json!({ "success": true })))
}

/// Admin: the notes view closed; cancel its autosave task.
#[axum::debug_handler]
pub async fn close_notes_draft(
    State(state): State<LeadState>,
    TypedHeader(_auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(call_booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let closed = state.drafts.close(call_booking_id);
    Ok(Json(json!({ "closed": closed })))
}

fn map_lead_error(error: LeadError) -> AppError {
    match error {
        LeadError::MissingField(_)
        | LeadError::InvalidEmail
        | LeadError::NoServiceSelected
        | LeadError::ConsentRequired => AppError::ValidationError(error.to_string()),
        LeadError::InvalidStatusTransition { .. } => AppError::BadRequest(error.to_string()),
        LeadError::QuoteNotFound(_) => AppError::NotFound(error.to_string()),
        LeadError::DatabaseError(msg) => AppError::Database(msg),
    }
}
