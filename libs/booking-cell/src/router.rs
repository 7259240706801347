// libs/booking-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, BookingState};

pub fn booking_routes(config: Arc<AppConfig>) -> Router {
    let state = BookingState::new(config.clone());

    // The slot picker and the booking form are public; triage is staff-only
    let public_routes = Router::new()
        .route("/slots", get(handlers::get_blocked_slots))
        .route("/", post(handlers::book_call));

    let admin_routes = Router::new()
        .route("/", get(handlers::list_bookings))
        .route("/{booking_id}/status", patch(handlers::update_booking_status))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/manage", admin_routes)
        .with_state(state)
}
