use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and active components.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME"),
        "parser": state.pipeline.parser_strategy(),
        "embedding_model": state.pipeline.embedding_model(),
        "indexed": state.pipeline.index().len().await,
    }))
}
