//! Embedding provider abstraction
//!
//! An [`EmbeddingProvider`] turns text into fixed-dimension vectors. The
//! retrieval core never talks to a model directly; it only sees this trait,
//! so any backend (Ollama, a hosted API, a test double) can be plugged in.
//!
//! Vectors from different providers or models are not comparable. Nothing at
//! ranking time can detect that, which is why the persisted corpus cache
//! records [`EmbeddingProvider::model_name`] in its header.

pub mod ollama;

pub use ollama::OllamaEmbeddingProvider;

use crate::error::{PaperSearchError, Result};
use crate::types::EmbeddingVector;
use async_trait::async_trait;
use tracing::debug;

/// Maps text to embedding vectors
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed `texts`, returning one vector per input in the same order
    ///
    /// # Errors
    ///
    /// Backend failures (auth, quota, network) are reported as
    /// `PaperSearchError::Provider`.
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>>;

    /// Identifier of the model producing the vectors
    fn model_name(&self) -> &str;

    /// Vector dimension, when the provider knows it up front
    fn dimension(&self) -> Option<usize> {
        None
    }
}

/// Embeds `texts` in chunks of `batch_size`, one provider call per chunk
///
/// Chunks are sent in order and the results concatenated, so the output is
/// aligned with the input.
///
/// # Errors
///
/// Returns `PaperSearchError::Validation` for a zero batch size,
/// `PaperSearchError::Provider` if a call fails or returns the wrong number of
/// vectors, and `PaperSearchError::DimensionMismatch` if the vectors do not
/// all share one dimension.
///
/// # Examples
///
/// ```no_run
/// use papersearch_core::ai::OllamaClient;
/// use papersearch_core::embedding::{embed_in_batches, OllamaEmbeddingProvider};
///
/// # async fn example() -> papersearch_core::Result<()> {
/// let client = OllamaClient::new("http://localhost:11434")?;
/// let provider = OllamaEmbeddingProvider::new(client, "nomic-embed-text");
/// let texts = vec!["first paper".to_string(), "second paper".to_string()];
/// let vectors = embed_in_batches(&provider, &texts, 5).await?;
/// assert_eq!(vectors.len(), 2);
/// # Ok(())
/// # }
/// ```
pub async fn embed_in_batches<P>(
    provider: &P,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<EmbeddingVector>>
where
    P: EmbeddingProvider + ?Sized,
{
    if batch_size == 0 {
        return Err(PaperSearchError::validation("batch_size must be greater than 0"));
    }

    let mut embeddings = Vec::with_capacity(texts.len());
    let total_batches = texts.len().div_ceil(batch_size);

    for (batch_idx, chunk) in texts.chunks(batch_size).enumerate() {
        debug!(
            "Embedding batch {}/{} ({} texts)",
            batch_idx + 1,
            total_batches,
            chunk.len()
        );

        let batch = provider.embed(chunk).await?;
        if batch.len() != chunk.len() {
            return Err(PaperSearchError::provider(format!(
                "Provider returned {} vectors for {} texts in batch {}",
                batch.len(),
                chunk.len(),
                batch_idx + 1
            )));
        }

        embeddings.extend(batch);
    }

    if let Some(first) = embeddings.first() {
        let expected = first.len();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
            return Err(PaperSearchError::dimension_mismatch(expected, bad.len()));
        }
    }

    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct LengthProvider {
        calls: AtomicUsize,
        drop_last: bool,
        ragged: bool,
    }

    impl LengthProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                drop_last: false,
                ragged: false,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for LengthProvider {
        async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let mut out: Vec<EmbeddingVector> = texts
                .iter()
                .map(|t| vec![t.len() as f32, 1.0])
                .collect();
            if self.drop_last {
                out.pop();
            }
            if self.ragged && call == 1 {
                out[0].push(0.0);
            }
            Ok(out)
        }

        fn model_name(&self) -> &str {
            "length"
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| "x".repeat(i + 1)).collect()
    }

    #[tokio::test]
    async fn test_one_call_per_batch_in_order() {
        let provider = LengthProvider::new();
        let vectors = embed_in_batches(&provider, &texts(12), 5).await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(vectors.len(), 12);
        for (i, v) in vectors.iter().enumerate() {
            assert_eq!(v[0], (i + 1) as f32);
        }
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let provider = LengthProvider::new();
        let vectors = embed_in_batches(&provider, &[], 5).await.unwrap();
        assert!(vectors.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let provider = LengthProvider::new();
        let result = embed_in_batches(&provider, &texts(2), 0).await;
        assert!(matches!(result, Err(PaperSearchError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_wrong_vector_count_is_provider_error() {
        let mut provider = LengthProvider::new();
        provider.drop_last = true;
        let result = embed_in_batches(&provider, &texts(3), 5).await;
        assert!(matches!(result, Err(PaperSearchError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_inconsistent_dimensions_detected() {
        let mut provider = LengthProvider::new();
        provider.ragged = true;
        let result = embed_in_batches(&provider, &texts(4), 2).await;
        assert!(matches!(
            result,
            Err(PaperSearchError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }
}
