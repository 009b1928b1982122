//! Pipeline Orchestrator: one uploaded document in, one `PipelineResult` out.
//!
//! Stage order is extract, parse, embed, store, index. The store assigns the
//! durable id and only then is the vector indexed under that id, so an index
//! entry never points at a record that does not exist. Any stage failure
//! halts the invocation with a `PipelineError` naming the stage; nothing is
//! retried.

pub mod handlers;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::embedding::{Embedder, EmbeddingError};
use crate::extraction::{DocumentExtractor, ExtractedText, ExtractionError};
use crate::models::resume::StoredResume;
use crate::parsing::models::{AtsFeedback, ExperienceLevel, ResumeRecord};
use crate::parsing::{FieldRepair, ParseError, ParserStrategy, ResumeParser};
use crate::store::{PersistenceError, ResumeStore};
use crate::vector_index::{IndexError, SearchHit, VectorIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    Parse,
    Embed,
    Store,
    Index,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Parse => "parse",
            Stage::Embed => "embed",
            Stage::Store => "store",
            Stage::Index => "index",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Received,
    Extracted,
    Parsed,
    Embedded,
    Stored,
    Indexed,
    Completed,
    Failed { stage: Stage, cause: String },
}

/// The cause half of a `PipelineError`.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("unsupported document format '{0}'")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Extraction(ExtractionError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("stage did not finish within {0:?}")]
    Timeout(Duration),
}

impl From<ExtractionError> for StageError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::UnsupportedFormat(format) => StageError::UnsupportedFormat(format),
            other => StageError::Extraction(other),
        }
    }
}

#[derive(Debug, Error)]
#[error("{stage} stage failed: {cause}")]
pub struct PipelineError {
    pub stage: Stage,
    pub cause: StageError,
}

impl PipelineError {
    /// Stable machine-readable code for the cause.
    pub fn code(&self) -> &'static str {
        match self.cause {
            StageError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            StageError::Extraction(_) => "EXTRACTION_FAILED",
            StageError::Parse(_) => "PARSE_FAILED",
            StageError::Embedding(_) => "EMBEDDING_FAILED",
            StageError::Index(_) => "INDEX_FAILED",
            StageError::Persistence(_) => "PERSISTENCE_FAILED",
            StageError::Timeout(_) => "STAGE_TIMEOUT",
        }
    }
}

/// Tracks one invocation through its states.
struct Invocation {
    id: Uuid,
    state: PipelineState,
}

impl Invocation {
    fn start(format: &str, bytes: usize) -> Self {
        let id = Uuid::new_v4();
        debug!(invocation = %id, format, bytes, "pipeline received document");
        Self {
            id,
            state: PipelineState::Received,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug!(invocation = %self.id, from = ?self.state, to = ?next, "pipeline state transition");
        self.state = next;
    }

    fn fail(&mut self, stage: Stage, cause: StageError) -> PipelineError {
        warn!(invocation = %self.id, %stage, error = %cause, "pipeline failed");
        self.state = PipelineState::Failed {
            stage,
            cause: cause.to_string(),
        };
        PipelineError { stage, cause }
    }
}

/// Flattened view of the record fields most callers want directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeSummary {
    pub experience_level: ExperienceLevel,
    pub recommended_roles: Vec<String>,
    pub ats_feedback: AtsFeedback,
}

impl ResumeSummary {
    /// `None` when the parser filled none of the summary fields.
    pub fn from_record(record: &ResumeRecord) -> Option<Self> {
        let present = record.experience_level != ExperienceLevel::Unknown
            || !record.recommended_roles.is_empty()
            || !record.ats_feedback.is_empty();
        present.then(|| ResumeSummary {
            experience_level: record.experience_level,
            recommended_roles: record.recommended_roles.clone(),
            ats_feedback: record.ats_feedback.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub resume_id: Uuid,
    pub parser: ParserStrategy,
    pub record: ResumeRecord,
    #[serde(flatten)]
    pub summary: Option<ResumeSummary>,
    pub repairs: Vec<FieldRepair>,
}

/// Runs `fut` under `limit`, mapping both its error and an elapsed timer into
/// a `StageError`.
async fn within<T, E>(
    limit: Option<Duration>,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<T, StageError>
where
    StageError: From<E>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| StageError::Timeout(limit))?
            .map_err(StageError::from),
        None => fut.await.map_err(StageError::from),
    }
}

pub struct ResumePipeline {
    extractor: Arc<DocumentExtractor>,
    parser: Arc<dyn ResumeParser>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ResumeStore>,
    index: VectorIndex,
    stage_timeout: Option<Duration>,
}

impl ResumePipeline {
    /// The index is sized from the embedder and lives as long as the pipeline.
    pub fn new(
        extractor: DocumentExtractor,
        parser: Arc<dyn ResumeParser>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn ResumeStore>,
        stage_timeout: Option<Duration>,
    ) -> Self {
        let index = VectorIndex::new(embedder.dimension());
        Self {
            extractor: Arc::new(extractor),
            parser,
            embedder,
            store,
            index,
            stage_timeout,
        }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn parser_strategy(&self) -> ParserStrategy {
        self.parser.strategy()
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.model()
    }

    /// processDocument: bytes plus declared format tag to a stored, indexed record.
    pub async fn process_document(
        &self,
        content: Bytes,
        format: &str,
    ) -> Result<PipelineResult, PipelineError> {
        let mut run = Invocation::start(format, content.len());

        if !self.extractor.supports(format) {
            return Err(run.fail(
                Stage::Extract,
                StageError::UnsupportedFormat(format.to_string()),
            ));
        }

        let text = self
            .extract(content, format)
            .await
            .map_err(|cause| run.fail(Stage::Extract, cause))?;
        run.advance(PipelineState::Extracted);

        let outcome = within(self.stage_timeout, self.parser.parse(&text))
            .await
            .map_err(|cause| run.fail(Stage::Parse, cause))?;
        for repair in &outcome.repairs {
            debug!(invocation = %run.id, ?repair, "field repaired");
        }
        run.advance(PipelineState::Parsed);

        let embedding = within(self.stage_timeout, self.embedder.embed(text.as_str()))
            .await
            .and_then(|embedding| {
                if embedding.dimension() != self.index.dimension() {
                    return Err(StageError::Embedding(EmbeddingError::DimensionMismatch {
                        expected: self.index.dimension(),
                        actual: embedding.dimension(),
                    }));
                }
                Ok(embedding)
            })
            .map_err(|cause| run.fail(Stage::Embed, cause))?;
        run.advance(PipelineState::Embedded);

        let resume_id = self
            .store
            .insert(&outcome.record, text.as_str())
            .await
            .map_err(|e| run.fail(Stage::Store, e.into()))?;
        run.advance(PipelineState::Stored);

        self.index
            .add(embedding, resume_id)
            .await
            .map_err(|e| run.fail(Stage::Index, e.into()))?;
        run.advance(PipelineState::Indexed);

        run.advance(PipelineState::Completed);
        info!(
            invocation = %run.id,
            %resume_id,
            parser = ?self.parser.strategy(),
            repairs = outcome.repairs.len(),
            "resume processed"
        );

        let summary = ResumeSummary::from_record(&outcome.record);
        Ok(PipelineResult {
            resume_id,
            parser: self.parser.strategy(),
            record: outcome.record,
            summary,
            repairs: outcome.repairs,
        })
    }

    /// Extraction is CPU-bound, so it runs on the blocking pool. On timeout
    /// the blocking task is abandoned, not cancelled.
    async fn extract(&self, content: Bytes, format: &str) -> Result<ExtractedText, StageError> {
        let extractor = Arc::clone(&self.extractor);
        let format = format.to_string();
        let task = tokio::task::spawn_blocking(move || extractor.extract(&content, &format));

        let joined = within(self.stage_timeout, async {
            task.await.map_err(|e| {
                StageError::Extraction(ExtractionError::Unreadable(format!(
                    "extraction task failed: {e}"
                )))
            })
        })
        .await?;
        joined.map_err(StageError::from)
    }

    /// Embeds `query` and returns the `k` nearest indexed résumés.
    pub async fn search_similar(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, PipelineError> {
        let embedding = within(self.stage_timeout, self.embedder.embed(query))
            .await
            .map_err(|cause| PipelineError {
                stage: Stage::Embed,
                cause,
            })?;
        self.index
            .search(&embedding, k)
            .await
            .map_err(|e| PipelineError {
                stage: Stage::Index,
                cause: e.into(),
            })
    }

    pub async fn get_resume(&self, id: Uuid) -> Result<Option<StoredResume>, PersistenceError> {
        self.store.get(id).await
    }
}
