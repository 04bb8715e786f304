//! Corpus store over the SQLite `papers` table written by the ingestion job

use crate::corpus::CorpusStore;
use crate::error::{PaperSearchError, Result};
use crate::types::PaperRecord;
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{debug, info};

const SNAPSHOT_QUERY: &str = r#"
    SELECT paper_id, title, abstract, year, url
    FROM papers
    ORDER BY rowid
"#;

/// Reads paper records from SQLite
///
/// Expects the schema
/// `papers(paper_id TEXT PRIMARY KEY, title TEXT, abstract TEXT, year INTEGER, url TEXT)`.
/// Rows come back in insertion order.
#[derive(Debug, Clone)]
pub struct SqliteCorpusStore {
    pool: SqlitePool,
}

impl SqliteCorpusStore {
    /// Wrap an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for `database_url` (e.g. `sqlite://papers.db`)
    ///
    /// # Errors
    ///
    /// Returns `PaperSearchError::DataUnavailable` if the database cannot be
    /// opened.
    pub async fn connect(database_url: &str) -> Result<Self> {
        debug!("Connecting to corpus database {}", database_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(database_url)
            .await
            .map_err(|e| {
                PaperSearchError::data_unavailable(format!(
                    "Failed to open corpus database {}: {}",
                    database_url, e
                ))
            })?;

        Ok(Self { pool })
    }

    /// Create a pool that opens connections on first use
    ///
    /// Lets callers construct the store even when the database is only
    /// needed after a cache miss.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_lazy(database_url)
            .map_err(|e| {
                PaperSearchError::validation(format!(
                    "Invalid corpus database URL {}: {}",
                    database_url, e
                ))
            })?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl CorpusStore for SqliteCorpusStore {
    async fn snapshot(&self) -> Result<Vec<PaperRecord>> {
        let rows = sqlx::query(SNAPSHOT_QUERY)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                PaperSearchError::data_unavailable(format!("Failed to read papers: {}", e))
            })?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("paper_id")?;
            let title: String = row.try_get("title")?;
            let abstract_text: String = row.try_get("abstract")?;
            let year: Option<i64> = row.try_get("year")?;
            let url: Option<String> = row.try_get("url")?;

            records.push(PaperRecord {
                id,
                title,
                abstract_text,
                year: year.and_then(|y| i32::try_from(y).ok()),
                url: url.unwrap_or_default(),
            });
        }

        info!("Read {} papers from corpus database", records.len());
        Ok(records)
    }
}
