//! Wiring from [`AppConfig`] to ready-to-use components

use crate::ai::{OllamaClient, OllamaTextGenerator, SectionGenerator};
use crate::config::AppConfig;
use crate::corpus::{CorpusStore, SqliteCorpusStore};
use crate::embedding::{EmbeddingProvider, OllamaEmbeddingProvider};
use crate::error::Result;
use crate::search::{CorpusEmbeddingCache, LoadOutcome, QueryEmbeddingCache, SearchService};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Long-lived collaborators shared by the CLI and the server
pub struct Components {
    pub config: AppConfig,
    pub client: OllamaClient,
    pub provider: Arc<dyn EmbeddingProvider>,
    pub store: Arc<dyn CorpusStore>,
    pub cache: Arc<CorpusEmbeddingCache>,
    /// `None` when generation is disabled in the configuration
    pub generator: Option<Arc<SectionGenerator>>,
}

impl Components {
    /// Build every component from configuration
    ///
    /// Performs no network or database I/O; the corpus database is opened on
    /// first use.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let client = OllamaClient::with_timeout(
            config.ollama_url()?.as_str(),
            Duration::from_secs(config.ollama.timeout_seconds),
        )?;

        let mut provider = OllamaEmbeddingProvider::new(client.clone(), &config.ollama.embedding_model);
        if config.ollama.single_embed_requests {
            provider = provider.with_single_requests();
        }
        if let Some(dimension) = config.ollama.embedding_dimension {
            provider = provider.with_dimension(dimension);
        }
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(provider);

        let store: Arc<dyn CorpusStore> =
            Arc::new(SqliteCorpusStore::connect_lazy(&config.corpus.database_url)?);

        let cache = Arc::new(
            CorpusEmbeddingCache::new(&config.cache.path, Arc::clone(&provider), Arc::clone(&store))
                .with_batch_size(config.cache.batch_size)?,
        );

        let generator = if config.generation.enabled {
            let text_generator =
                OllamaTextGenerator::new(client.clone(), &config.ollama.generation_model);
            Some(Arc::new(
                SectionGenerator::new(Arc::new(text_generator))?
                    .with_params(config.generation_params()),
            ))
        } else {
            None
        };

        Ok(Self {
            config: config.clone(),
            client,
            provider,
            store,
            cache,
            generator,
        })
    }

    /// Load the corpus table and build a search service over it
    pub async fn search_service(&self) -> Result<(SearchService, LoadOutcome)> {
        let outcome = self.cache.load().await?;
        info!(
            "Corpus embeddings ready: {} papers from {}",
            outcome.table.len(),
            outcome.source
        );

        let service = SearchService::new(Arc::clone(&self.provider), Arc::clone(&outcome.table))
            .with_settings(self.config.search_settings())
            .with_query_cache(QueryEmbeddingCache::new(
                self.config.search.query_cache_capacity,
            ));

        Ok((service, outcome))
    }
}
