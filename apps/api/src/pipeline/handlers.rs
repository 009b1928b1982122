use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::StoredResume;
use crate::pipeline::PipelineResult;
use crate::state::AppState;
use crate::vector_index::SearchHit;

const UPLOAD_FIELD: &str = "file";
const DEFAULT_K: usize = 5;
const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_k")]
    pub k: usize,
}

fn default_k() -> usize {
    DEFAULT_K
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
}

/// Lower-cased extension of an uploaded filename. Empty when there is none,
/// which the pipeline rejects as an unsupported format.
fn format_from_filename(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// POST /api/v1/resumes/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PipelineResult>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("uploaded file has no filename".to_string()))?;
        let format = format_from_filename(&filename);
        let content = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("could not read upload: {e}")))?;
        if content.is_empty() {
            return Err(AppError::Validation("uploaded file is empty".to_string()));
        }

        let result = state.pipeline.process_document(content, &format).await?;
        return Ok(Json(result));
    }

    Err(AppError::Validation(format!(
        "multipart field '{UPLOAD_FIELD}' is required"
    )))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StoredResume>, AppError> {
    state
        .pipeline
        .get_resume(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("resume {id}")))
}

/// POST /api/v1/resumes/search
pub async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(AppError::Validation("query must not be empty".to_string()));
    }
    if req.k == 0 || req.k > MAX_K {
        return Err(AppError::Validation(format!("k must be between 1 and {MAX_K}")));
    }
    let hits = state.pipeline.search_similar(&req.query, req.k).await?;
    Ok(Json(SearchResponse { hits }))
}
