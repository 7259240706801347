// libs/lead-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, LeadState};

pub fn lead_routes(config: Arc<AppConfig>) -> Router {
    let state = LeadState::new(config.clone());

    // The quote form is public; everything else is the staff console
    let public_routes = Router::new().route("/quotes", post(handlers::submit_quote));

    let admin_routes = Router::new()
        .route("/quotes", get(handlers::list_quotes))
        .route("/quotes/{quote_id}/status", patch(handlers::update_quote_status))
        .route("/quotes/{quote_id}", delete(handlers::delete_quote))
        .route("/quotes/{quote_id}/sections", get(handlers::get_quote_sections))
        .route("/clients", get(handlers::list_clients))
        .route("/clients/{client_email}", put(handlers::set_client_stage))
        .route("/call-notes/{call_booking_id}", get(handlers::get_call_notes))
        .route("/call-notes/{call_booking_id}", put(handlers::save_call_notes))
        .route("/call-notes/{call_booking_id}/draft", put(handlers::update_notes_draft))
        .route(
            "/call-notes/{call_booking_id}/draft",
            delete(handlers::close_notes_draft),
        )
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/manage", admin_routes)
        .with_state(state)
}
