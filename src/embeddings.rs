//! Embedding providers.
//!
//! The pipeline talks to embeddings through [`EmbeddingProvider`] so the
//! HTTP service can be swapped for the deterministic mock in tests.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::types::AskError;

/// Converts text into fixed-width vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AskError>;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Embeddings served over the Ollama HTTP API.
#[derive(Clone, Debug)]
pub struct OllamaEmbeddings {
    client: Client,
    base_url: Url,
    model: String,
}

impl OllamaEmbeddings {
    pub fn new(client: Client, base_url: Url, model: impl Into<String>) -> Self {
        Self {
            client,
            base_url,
            model: model.into(),
        }
    }

    fn endpoint(&self) -> Result<Url, AskError> {
        self.base_url
            .join("api/embeddings")
            .map_err(|err| AskError::Embedding(err.to_string()))
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AskError> {
        let endpoint = self.endpoint()?;
        let mut vectors = Vec::with_capacity(texts.len());

        for text in texts {
            let response = self
                .client
                .post(endpoint.clone())
                .json(&EmbedRequest {
                    model: &self.model,
                    prompt: text,
                })
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(AskError::Embedding(format!("{status}: {body}")));
            }

            let payload: EmbedResponse = response
                .json()
                .await
                .map_err(|err| AskError::Embedding(err.to_string()))?;
            if payload.embedding.is_empty() {
                return Err(AskError::Embedding("service returned an empty vector".into()));
            }
            vectors.push(payload.embedding);
        }

        debug!(count = vectors.len(), model = %self.model, "embedded batch");
        Ok(vectors)
    }
}

/// Deterministic hash-based embeddings for tests and offline runs.
///
/// Identical text always produces the identical vector; different text
/// almost always differs. The vectors carry no semantics.
#[derive(Clone, Debug)]
pub struct MockEmbeddings {
    dims: usize,
}

impl MockEmbeddings {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    fn hash_to_vec(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();
        (0..self.dims)
            .map(|i| {
                let bits = seed.rotate_left((i as u32 % 8) * 8) ^ ((i as u64) << 24);
                (bits as f32) / u32::MAX as f32
            })
            .collect()
    }
}

impl Default for MockEmbeddings {
    fn default() -> Self {
        Self::new(8)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AskError> {
        Ok(texts.iter().map(|text| self.hash_to_vec(text)).collect())
    }
}
