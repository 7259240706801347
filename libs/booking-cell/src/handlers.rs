// libs/booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use chrono::NaiveDate;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{
    BookCallRequest, BookingError, BookingSearchQuery, UpdateBookingStatusRequest,
};
use crate::services::booking::CallBookingService;

/// Router state: the config plus one process-wide booking service, so the
/// optimistic slot overlay survives across requests.
#[derive(Clone)]
pub struct BookingState {
    pub config: Arc<AppConfig>,
    pub service: Arc<CallBookingService>,
}

impl BookingState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let service = Arc::new(CallBookingService::new(&config));
        Self { config, service }
    }
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

/// Public: blocked slots for a date, for the booking widget's slot picker.
#[axum::debug_handler]
pub async fn get_blocked_slots(
    State(state): State<BookingState>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let blocked = state
        .service
        .blocked_slots_for_date(query.date)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "date": query.date,
        "blocked_slots": blocked,
    })))
}

/// Public: submit a call booking.
#[axum::debug_handler]
pub async fn book_call(
    State(state): State<BookingState>,
    Json(request): Json<BookCallRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = state
        .service
        .book_call(request)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
    })))
}

/// Admin: list bookings with optional date/status filters.
#[axum::debug_handler]
pub async fn list_bookings(
    State(state): State<BookingState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<BookingSearchQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let bookings = state
        .service
        .list_bookings(&query, auth.token())
        .await
        .map_err(map_booking_error)?;

    let count = bookings.len();
    Ok(Json(json!({
        "bookings": bookings,
        "count": count,
    })))
}

/// Admin: move a booking through its status lifecycle.
#[axum::debug_handler]
pub async fn update_booking_status(
    State(state): State<BookingState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let booking = state
        .service
        .update_status(booking_id, request.status, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
    })))
}

fn map_booking_error(error: BookingError) -> AppError {
    match error {
        BookingError::MissingField(_)
        | BookingError::InvalidEmail
        | BookingError::UnknownSlot(_)
        | BookingError::PastDate
        | BookingError::WeekendDate
        | BookingError::HorizonExceeded(_) => AppError::ValidationError(error.to_string()),
        BookingError::SlotUnavailable => {
            AppError::Conflict("This slot is no longer available".to_string())
        }
        BookingError::InvalidStatusTransition { .. } => AppError::BadRequest(error.to_string()),
        BookingError::NotFound(_) => AppError::NotFound(error.to_string()),
        BookingError::StaleFetch { .. } => AppError::Internal(error.to_string()),
        BookingError::DatabaseError(msg) => AppError::Database(msg),
    }
}
