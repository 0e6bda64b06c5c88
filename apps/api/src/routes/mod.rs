pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/ai/generate-resume",
            post(handlers::handle_generate_resume),
        )
        .route("/api/v1/templates", get(handlers::handle_list_templates))
        .with_state(state)
}
