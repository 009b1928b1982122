//! Local deterministic embedder.
//!
//! Signed feature hashing over lower-cased word unigrams, L2-normalised.
//! Same text and dimension always give the same vector, with no model
//! download or network call.

use async_trait::async_trait;

use crate::embedding::{check_input, Embedder, Embedding, EmbeddingError, HASHING_MODEL};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(token: &str) -> u64 {
    token
        .bytes()
        .fold(FNV_OFFSET, |hash, b| (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}

pub struct HashingEmbedder {
    dimension: usize,
    max_chars: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize, max_chars: usize) -> Self {
        Self {
            dimension,
            max_chars,
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut values = vec![0.0f32; self.dimension];
        let lower = text.to_lowercase();
        let tokens = lower
            .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
            .filter(|t| !t.is_empty());

        for token in tokens {
            let hash = fnv1a(token);
            let bucket = (hash % self.dimension as u64) as usize;
            // top bit picks the sign so collisions tend to cancel
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            values[bucket] += sign;
        }

        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            values.iter_mut().for_each(|v| *v /= norm);
        }
        values
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model(&self) -> &str {
        HASHING_MODEL
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let text = check_input(text, self.max_chars)?;
        let values = self.vectorize(text);
        if values.iter().all(|v| *v == 0.0) {
            // only punctuation or symbols
            return Err(EmbeddingError::EmptyInput);
        }
        Ok(Embedding::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder() -> HashingEmbedder {
        HashingEmbedder::new(64, 1_000)
    }

    fn distance(a: &Embedding, b: &Embedding) -> f32 {
        a.as_slice()
            .iter()
            .zip(b.as_slice())
            .map(|(x, y)| (x - y) * (x - y))
            .sum()
    }

    #[tokio::test]
    async fn test_deterministic() {
        let a = embedder().embed("Rust engineer, Kafka and SQL").await.unwrap();
        let b = embedder().embed("Rust engineer, Kafka and SQL").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dimension(), 64);
    }

    #[tokio::test]
    async fn test_unit_length() {
        let e = embedder().embed("python python sql").await.unwrap();
        let norm: f32 = e.as_slice().iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_case_insensitive() {
        let a = embedder().embed("PYTHON Developer").await.unwrap();
        let b = embedder().embed("python developer").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_similar_text_is_closer() {
        let e = embedder();
        let query = e.embed("python sql data engineer").await.unwrap();
        let near = e.embed("data engineer python sql airflow").await.unwrap();
        let far = e.embed("registered nurse pediatric ward").await.unwrap();
        assert!(distance(&query, &near) < distance(&query, &far));
    }

    #[tokio::test]
    async fn test_rejects_empty_and_oversized() {
        assert!(matches!(
            embedder().embed("").await,
            Err(EmbeddingError::EmptyInput)
        ));
        assert!(matches!(
            embedder().embed("--- ...").await,
            Err(EmbeddingError::EmptyInput)
        ));
        let long = "a".repeat(1_001);
        assert!(matches!(
            embedder().embed(&long).await,
            Err(EmbeddingError::InputTooLong { len: 1_001, max: 1_000 })
        ));
    }
}
