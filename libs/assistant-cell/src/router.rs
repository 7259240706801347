// libs/assistant-cell/src/router.rs
use std::sync::Arc;

use axum::{middleware, routing::post, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn assistant_routes(config: Arc<AppConfig>) -> Router {
    // The chatbot is public; assistant tasks belong to the staff console
    let public_routes = Router::new().route("/chatbot", post(handlers::chat));

    let admin_routes = Router::new()
        .route("/", post(handlers::run_assistant))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(config)
}
