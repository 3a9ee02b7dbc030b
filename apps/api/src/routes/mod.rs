pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::assessments::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/assessments/suggestions",
            post(handlers::handle_generate_suggestions),
        )
        .route(
            "/api/v1/assessments/latest",
            get(handlers::handle_latest_assessment),
        )
        .route(
            "/api/v1/assessments/history",
            get(handlers::handle_assessment_history),
        )
        .with_state(state)
}
