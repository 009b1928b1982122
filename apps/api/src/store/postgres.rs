use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::resume::{ParsedResumeRow, StoredResume};
use crate::parsing::models::ResumeRecord;
use crate::store::{PersistenceError, ResumeStore};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS parsed_resumes (
    id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    record      JSONB NOT NULL,
    raw_text    TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Postgres-backed store over the `parsed_resumes` table.
#[derive(Clone)]
pub struct PgResumeStore {
    pool: PgPool,
}

impl PgResumeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool and makes sure the table exists.
    pub async fn connect(database_url: &str) -> Result<Self, PersistenceError> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        info!("PostgreSQL connection pool established");

        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), PersistenceError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ResumeStore for PgResumeStore {
    async fn insert(&self, record: &ResumeRecord, raw_text: &str) -> Result<Uuid, PersistenceError> {
        let record = serde_json::to_value(record)?;
        let id = sqlx::query_scalar(
            "INSERT INTO parsed_resumes (record, raw_text) VALUES ($1, $2) RETURNING id",
        )
        .bind(record)
        .bind(raw_text)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredResume>, PersistenceError> {
        let row = sqlx::query_as::<_, ParsedResumeRow>(
            "SELECT id, record, raw_text, created_at FROM parsed_resumes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoredResume::try_from)
            .transpose()
            .map_err(PersistenceError::from)
    }
}
