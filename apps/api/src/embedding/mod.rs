//! Embedding generation.
//!
//! An `Embedder` maps text to a fixed-dimension vector. The dimension is
//! fixed when the embedder is constructed and every vector it returns has
//! exactly that length. Oversized input is rejected, never truncated.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub mod hashing;
pub mod http;

pub use hashing::HashingEmbedder;
pub use http::HttpEmbedder;

/// Model id that selects the local `HashingEmbedder`.
pub const HASHING_MODEL: &str = "hashing";

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("cannot embed empty input")]
    EmptyInput,

    #[error("input of {len} characters exceeds the limit of {max}")]
    InputTooLong { len: usize, max: usize },

    #[error("embedding has dimension {actual}, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding provider error: {0}")]
    Provider(String),
}

/// Immutable vector. Cloning shares the underlying buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    values: Arc<[f32]>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            values: values.into(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

#[async_trait]
pub trait Embedder: Send + Sync {
    fn model(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;
}

/// Shared size check for every embedder. Returns the trimmed input.
pub(crate) fn check_input(text: &str, max_chars: usize) -> Result<&str, EmbeddingError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(EmbeddingError::EmptyInput);
    }
    let len = text.chars().count();
    if len > max_chars {
        return Err(EmbeddingError::InputTooLong {
            len,
            max: max_chars,
        });
    }
    Ok(text)
}
