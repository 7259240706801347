use std::sync::Arc;

use axum::{routing::get, Router};

use assistant_cell::router::assistant_routes;
use booking_cell::router::booking_routes;
use lead_cell::router::lead_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Nexus agency API is running!" }))
        .nest("/bookings", booking_routes(state.clone()))
        .nest("/leads", lead_routes(state.clone()))
        .nest("/assistant", assistant_routes(state))
}
