pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::evaluation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/interviews/:id/evaluate",
            post(handlers::handle_request_evaluation),
        )
        .route(
            "/api/v1/interviews/:id/evaluation",
            get(handlers::handle_get_evaluation),
        )
        .with_state(state)
}
