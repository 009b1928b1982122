pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Resume API
        .route("/api/v1/resumes/analyze", post(handlers::handle_analyze))
        .route("/api/v1/resumes/search", post(handlers::handle_search))
        .route("/api/v1/resumes/:id", get(handlers::handle_get_resume))
        .with_state(state)
}
