//! PaperSearch Core Library
//!
//! Semantic search over research-paper abstracts. Paper metadata is read from
//! a corpus store, embedded once through an embedding provider, cached on
//! disk, and ranked by cosine similarity against query embeddings. An
//! optional section generator drafts paper sections from search results.

pub mod ai;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod runtime;
pub mod search;
pub mod types;

// Re-export commonly used types
pub use ai::{GeneratedSection, PaperSection, SectionGenerator, TextGenerator};
pub use config::AppConfig;
pub use corpus::{CorpusStore, InMemoryCorpusStore, SqliteCorpusStore};
pub use embedding::{EmbeddingProvider, OllamaEmbeddingProvider};
pub use error::{ErrorCategory, PaperSearchError, Result};
pub use runtime::Components;
pub use search::{
    CacheSource, CorpusEmbeddingCache, LoadOutcome, SearchHit, SearchRequest, SearchResponse,
    SearchService,
};
pub use types::{CorpusEmbeddingTable, EmbeddingVector, PaperRecord, YearRange};

/// Initialize logging with custom configuration
///
/// `level` is an `EnvFilter` directive; `RUST_LOG` takes precedence when set.
pub fn init_logging_with_config(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match format {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        "text" | "pretty" => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        _ => {
            return Err(PaperSearchError::validation(format!(
                "Unknown log format: {}",
                format
            )));
        }
    };

    result.map_err(|e| PaperSearchError::validation(format!("Failed to initialize logging: {}", e)))
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version info as a formatted string
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}
