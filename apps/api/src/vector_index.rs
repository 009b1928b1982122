//! In-memory nearest-neighbour index over résumé embeddings.
//!
//! Append-only: entries are never removed or replaced. All writes go through
//! a single `RwLock` owned by the index, so concurrent pipeline invocations
//! can add without coordinating. Search is exact (brute-force squared L2).

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::embedding::Embedding;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector has dimension {actual}, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("resume {0} is already indexed")]
    DuplicateId(Uuid),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub resume_id: Uuid,
    pub distance: f32,
}

#[derive(Default)]
struct IndexState {
    entries: Vec<(Uuid, Embedding)>,
    ids: HashSet<Uuid>,
}

pub struct VectorIndex {
    dimension: usize,
    state: RwLock<IndexState>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: RwLock::new(IndexState::default()),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check_dimension(&self, embedding: &Embedding) -> Result<(), IndexError> {
        if embedding.dimension() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.dimension(),
            });
        }
        Ok(())
    }

    pub async fn add(&self, embedding: Embedding, id: Uuid) -> Result<(), IndexError> {
        self.check_dimension(&embedding)?;
        let mut state = self.state.write().await;
        if !state.ids.insert(id) {
            return Err(IndexError::DuplicateId(id));
        }
        state.entries.push((id, embedding));
        Ok(())
    }

    /// Up to `k` hits, nearest first. Ties keep insertion order.
    pub async fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchHit>, IndexError> {
        self.check_dimension(query)?;
        let state = self.state.read().await;
        let mut hits: Vec<SearchHit> = state
            .entries
            .iter()
            .map(|(id, embedding)| SearchHit {
                resume_id: *id,
                distance: squared_l2(query.as_slice(), embedding.as_slice()),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    #[cfg(test)]
    pub async fn contains(&self, id: Uuid) -> bool {
        self.state.read().await.ids.contains(&id)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
