//! Remote embedder for OpenAI-compatible `/embeddings` endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::{check_input, Embedder, Embedding, EmbeddingError};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Clone)]
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimension: usize,
    max_chars: usize,
}

impl HttpEmbedder {
    pub fn new(
        api_key: String,
        base_url: &str,
        model: String,
        dimension: usize,
        max_chars: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::Provider(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model,
            dimension,
            max_chars,
        })
    }

    fn embedding_from(&self, response: EmbeddingResponse) -> Result<Embedding, EmbeddingError> {
        let values = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::Provider("response contained no embeddings".into()))?;
        if values.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: values.len(),
            });
        }
        Ok(Embedding::new(values))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let input = check_input(text, self.max_chars)?;
        let request = EmbeddingRequest {
            model: &self.model,
            input,
            dimensions: self.dimension,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EmbeddingError::Provider(format!(
                "embeddings request failed ({status}): {body}"
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Provider(format!("invalid embeddings response: {e}")))?;
        debug!(model = %self.model, chars = input.len(), "embedding call succeeded");
        self.embedding_from(parsed)
    }
}
