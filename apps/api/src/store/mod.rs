//! Résumé persistence.
//!
//! The store assigns the durable identifier at insert time. Records are
//! append-only: there is no update or delete path.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::resume::StoredResume;
use crate::parsing::models::ResumeRecord;

pub mod postgres;

pub use postgres::PgResumeStore;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// Persists one record and returns its new identifier.
    async fn insert(&self, record: &ResumeRecord, raw_text: &str) -> Result<Uuid, PersistenceError>;

    async fn get(&self, id: Uuid) -> Result<Option<StoredResume>, PersistenceError>;
}

/// Process-local store used when no database is configured.
#[derive(Default)]
pub struct InMemoryResumeStore {
    rows: Mutex<Vec<StoredResume>>,
}

impl InMemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }
}

#[async_trait]
impl ResumeStore for InMemoryResumeStore {
    async fn insert(&self, record: &ResumeRecord, raw_text: &str) -> Result<Uuid, PersistenceError> {
        let id = Uuid::new_v4();
        self.rows.lock().await.push(StoredResume {
            id,
            record: record.clone(),
            raw_text: raw_text.to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredResume>, PersistenceError> {
        Ok(self.rows.lock().await.iter().find(|r| r.id == id).cloned())
    }
}
