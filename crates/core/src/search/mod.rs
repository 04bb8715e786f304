//! Semantic search over the paper corpus
//!
//! - [`corpus_cache`]: builds, persists and reloads the corpus embedding table
//! - [`ranker`]: brute-force cosine ranking
//! - [`query_cache`]: memoized query embeddings
//! - [`service`]: query text in, ranked hits out

pub mod corpus_cache;
pub mod query_cache;
pub mod ranker;
pub mod service;

pub use corpus_cache::{CacheInfo, CacheSource, CorpusEmbeddingCache, LoadOutcome};
pub use query_cache::QueryEmbeddingCache;
pub use ranker::{clamped_similarity, normalize, rank, rank_where, RankedPaper};
pub use service::{SearchHit, SearchRequest, SearchResponse, SearchService, SearchSettings};
