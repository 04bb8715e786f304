//! Text query to ranked papers

use crate::embedding::EmbeddingProvider;
use crate::error::{PaperSearchError, Result};
use crate::search::query_cache::QueryEmbeddingCache;
use crate::search::ranker::{rank_where, RankedPaper};
use crate::types::{CorpusEmbeddingTable, EmbeddingVector, YearRange};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Search input as accepted over HTTP and from the CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub year_min: Option<i32>,
    #[serde(default)]
    pub year_max: Option<i32>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_years(mut self, year_min: Option<i32>, year_max: Option<i32>) -> Self {
        self.year_min = year_min;
        self.year_max = year_max;
        self
    }
}

/// One ranked paper in a search response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub year: Option<i32>,
    pub url: String,
    pub similarity: f32,
}

impl From<RankedPaper> for SearchHit {
    fn from(ranked: RankedPaper) -> Self {
        let record = ranked.record;
        Self {
            id: record.id,
            title: record.title,
            abstract_text: record.abstract_text,
            year: record.year,
            url: record.url,
            similarity: ranked.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub count: usize,
}

/// Tunables for [`SearchService`]
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub provider_timeout: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 100,
            provider_timeout: Duration::from_secs(30),
        }
    }
}

/// Embeds queries and ranks them against a loaded corpus table
///
/// Holds the table by `Arc`; every request reads the same immutable table.
pub struct SearchService {
    provider: Arc<dyn EmbeddingProvider>,
    table: Arc<CorpusEmbeddingTable>,
    query_cache: QueryEmbeddingCache,
    settings: SearchSettings,
}

impl SearchService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, table: Arc<CorpusEmbeddingTable>) -> Self {
        Self {
            provider,
            table,
            query_cache: QueryEmbeddingCache::default(),
            settings: SearchSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SearchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_query_cache(mut self, query_cache: QueryEmbeddingCache) -> Self {
        self.query_cache = query_cache;
        self
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn table(&self) -> &Arc<CorpusEmbeddingTable> {
        &self.table
    }

    pub fn corpus_size(&self) -> usize {
        self.table.len()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Run a search
    ///
    /// The query is trimmed and lower-cased before embedding.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for an empty query, `top_k` above the maximum, or
    ///   inverted year bounds (checked before calling the provider)
    /// - `Timeout` when the provider does not answer in time
    /// - `Provider` when the provider fails
    /// - `DimensionMismatch` when the query vector does not fit the table
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let query = normalize_query(&request.query);
        if query.is_empty() {
            return Err(PaperSearchError::invalid_request("Query is required"));
        }

        let top_k = request.top_k.unwrap_or(self.settings.default_top_k);
        if top_k > self.settings.max_top_k {
            return Err(PaperSearchError::invalid_request(format!(
                "top_k must be at most {}",
                self.settings.max_top_k
            )));
        }

        let years = YearRange::new(request.year_min, request.year_max)?;

        let embedding = self.embed_query(&query).await?;
        let ranked = rank_where(&embedding, &self.table, top_k, |record| {
            years.contains(record.year)
        })?;

        let results: Vec<SearchHit> = ranked.into_iter().map(SearchHit::from).collect();
        info!(
            "Search '{}' returned {} results (top_k {})",
            query,
            results.len(),
            top_k
        );

        Ok(SearchResponse {
            count: results.len(),
            results,
        })
    }

    /// Embed an already normalized query, using the query cache
    pub async fn embed_query(&self, query: &str) -> Result<Arc<EmbeddingVector>> {
        let provider = Arc::clone(&self.provider);
        let timeout = self.settings.provider_timeout;

        self.query_cache
            .get_or_compute(query, |text| async move {
                debug!("Embedding query '{}'", text);
                let texts = [text];
                let mut vectors = tokio::time::timeout(timeout, provider.embed(&texts))
                    .await
                    .map_err(|_| {
                        PaperSearchError::timeout(format!(
                            "query embedding after {}s",
                            timeout.as_secs_f32()
                        ))
                    })??;

                match (vectors.pop(), vectors.is_empty()) {
                    (Some(vector), true) => Ok(vector),
                    _ => Err(PaperSearchError::provider(
                        "Provider did not return exactly one query embedding",
                    )),
                }
            })
            .await
    }
}

/// Trim and lower-case a query
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}
