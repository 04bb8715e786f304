//! Ollama-backed embedding provider

use crate::ai::client::{EmbedBatchRequest, EmbedRequest, OllamaClient};
use crate::embedding::EmbeddingProvider;
use crate::error::{PaperSearchError, Result};
use crate::types::EmbeddingVector;
use async_trait::async_trait;
use std::sync::OnceLock;
use tracing::debug;

/// Embeds text through a local Ollama server
///
/// Uses the batch `/api/embed` endpoint by default. Older Ollama releases
/// only expose `/api/embeddings`; [`Self::with_single_requests`] switches to
/// one request per text.
#[derive(Debug)]
pub struct OllamaEmbeddingProvider {
    client: OllamaClient,
    model: String,
    single_requests: bool,
    dimension: OnceLock<usize>,
}

impl OllamaEmbeddingProvider {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            single_requests: false,
            dimension: OnceLock::new(),
        }
    }

    /// Use the legacy per-text `/api/embeddings` endpoint
    pub fn with_single_requests(mut self) -> Self {
        self.single_requests = true;
        self
    }

    /// Declare the model dimension instead of learning it from the first response
    pub fn with_dimension(self, dimension: usize) -> Self {
        let _ = self.dimension.set(dimension);
        self
    }

    async fn embed_one_by_one(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            let vector = self
                .client
                .embed(EmbedRequest {
                    model: self.model.clone(),
                    prompt: text.clone(),
                })
                .await?;
            vectors.push(vector);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = if self.single_requests {
            self.embed_one_by_one(texts).await
        } else {
            self.client
                .embed_batch(EmbedBatchRequest {
                    model: self.model.clone(),
                    input: texts.to_vec(),
                })
                .await
        }
        .map_err(|e| match e {
            PaperSearchError::Provider { .. } => e,
            other => PaperSearchError::provider(other.to_string()),
        })?;

        if let Some(first) = vectors.first() {
            let learned = *self.dimension.get_or_init(|| first.len());
            if let Some(bad) = vectors.iter().find(|v| v.len() != learned) {
                return Err(PaperSearchError::dimension_mismatch(learned, bad.len()));
            }
            debug!("Embedded {} texts with dimension {}", vectors.len(), learned);
        }

        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension.get().copied()
    }
}
