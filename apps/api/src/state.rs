use std::sync::Arc;

use crate::pipeline::ResumePipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Built once at startup; every component inside is constructed from `Config`.
    pub pipeline: Arc<ResumePipeline>,
}
