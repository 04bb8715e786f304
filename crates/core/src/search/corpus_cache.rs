//! Corpus embedding cache
//!
//! Holds the embedding table for the whole corpus. The table is built once
//! from a full corpus snapshot, written to disk, and read back on later
//! starts. Nothing invalidates it automatically: call
//! [`CorpusEmbeddingCache::invalidate`] after re-ingesting papers or
//! switching embedding models.
//!
//! # Persisted format
//!
//! A single JSON document:
//!
//! ```text
//! {
//!   "format_version": 1,
//!   "model": "nomic-embed-text",
//!   "dimension": 768,
//!   "created_at": "2024-05-01T12:00:00Z",
//!   "corpus_fingerprint": "<sha256 of ids>",
//!   "records": [ { "id": ..., "title": ..., "abstract": ..., "year": ..., "url": ... } ],
//!   "embeddings": [ "<base64 little-endian f32>" ]
//! }
//! ```
//!
//! Embeddings are stored as raw little-endian bytes so they reload
//! bit-for-bit. The file is written to `<path>.tmp` and renamed into place.

use crate::corpus::{corpus_fingerprint, CorpusStore};
use crate::embedding::{embed_in_batches, EmbeddingProvider};
use crate::error::{PaperSearchError, Result};
use crate::types::{CorpusEmbeddingTable, EmbeddingVector, PaperRecord};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Version written into new cache files
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Texts per provider call when building the table
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Where a loaded table came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheSource {
    /// Already held by this cache object
    Memory,
    /// Decoded from the persisted file
    Persisted,
    /// Built from the corpus store and the embedding provider
    Computed,
}

impl fmt::Display for CacheSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Persisted => write!(f, "persisted"),
            Self::Computed => write!(f, "computed"),
        }
    }
}

/// Result of [`CorpusEmbeddingCache::load`]
#[derive(Debug)]
pub struct LoadOutcome {
    pub table: Arc<CorpusEmbeddingTable>,
    pub source: CacheSource,
    /// Set when a freshly built table could not be written to disk
    pub persist_warning: Option<PaperSearchError>,
}

/// Header of a persisted cache file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheInfo {
    pub path: PathBuf,
    pub format_version: u32,
    pub model: String,
    pub dimension: usize,
    pub entries: usize,
    pub created_at: DateTime<Utc>,
    pub corpus_fingerprint: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedCache {
    format_version: u32,
    model: String,
    dimension: usize,
    created_at: DateTime<Utc>,
    corpus_fingerprint: String,
    records: Vec<PaperRecord>,
    embeddings: Vec<String>,
}

/// Lazily built, persisted embedding table for the corpus
pub struct CorpusEmbeddingCache {
    path: PathBuf,
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn CorpusStore>,
    batch_size: usize,
    table: Mutex<Option<Arc<CorpusEmbeddingTable>>>,
}

impl CorpusEmbeddingCache {
    pub fn new(
        path: impl Into<PathBuf>,
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn CorpusStore>,
    ) -> Self {
        Self {
            path: path.into(),
            provider,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
            table: Mutex::new(None),
        }
    }

    /// Set the number of texts sent per provider call
    ///
    /// # Errors
    ///
    /// Returns `PaperSearchError::Validation` for zero.
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(PaperSearchError::validation(
                "cache batch_size must be greater than 0",
            ));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Model id of the provider this cache embeds with
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// The table held in memory, if `load` has succeeded
    pub async fn cached_table(&self) -> Option<Arc<CorpusEmbeddingTable>> {
        self.table.lock().await.clone()
    }

    /// Return the corpus embedding table, building it if necessary
    ///
    /// Checks memory, then the persisted file, then embeds a fresh corpus
    /// snapshot. Concurrent callers wait for a single build.
    ///
    /// # Errors
    ///
    /// - `DataUnavailable` if the store fails or is empty
    /// - `Provider` if embedding fails; nothing is written
    /// - `DimensionMismatch` if the provider returns ragged vectors or the
    ///   persisted dimension disagrees with the provider
    /// - `ModelMismatch` if the persisted file came from another model
    pub async fn load(&self) -> Result<LoadOutcome> {
        let mut guard = self.table.lock().await;

        if let Some(table) = guard.as_ref() {
            return Ok(LoadOutcome {
                table: Arc::clone(table),
                source: CacheSource::Memory,
                persist_warning: None,
            });
        }

        if let Some(table) = self.read_persisted().await? {
            let table = Arc::new(table);
            info!(
                "Loaded {} corpus embeddings from {}",
                table.len(),
                self.path.display()
            );
            *guard = Some(Arc::clone(&table));
            return Ok(LoadOutcome {
                table,
                source: CacheSource::Persisted,
                persist_warning: None,
            });
        }

        let table = Arc::new(self.compute().await?);
        let persist_warning = match self.save(&table).await {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    "Failed to persist corpus embeddings to {}: {}",
                    self.path.display(),
                    e
                );
                Some(PaperSearchError::cache_persist(e.to_string()))
            }
        };

        *guard = Some(Arc::clone(&table));
        Ok(LoadOutcome {
            table,
            source: CacheSource::Computed,
            persist_warning,
        })
    }

    /// Drop the in-memory table and delete the persisted file
    ///
    /// A missing file is not an error.
    pub async fn invalidate(&self) -> Result<()> {
        let mut guard = self.table.lock().await;
        *guard = None;

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Removed corpus embedding cache {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `table` to the cache path
    pub async fn save(&self, table: &CorpusEmbeddingTable) -> Result<()> {
        let persisted = PersistedCache {
            format_version: CACHE_FORMAT_VERSION,
            model: self.provider.model_name().to_string(),
            dimension: table.dimension().unwrap_or(0),
            created_at: Utc::now(),
            corpus_fingerprint: corpus_fingerprint(table.records()),
            records: table.records().to_vec(),
            embeddings: table.embeddings().iter().map(|e| encode_vector(e)).collect(),
        };
        let bytes = serde_json::to_vec(&persisted)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = tmp_path(&self.path);
        if let Err(e) = tokio::fs::write(&tmp, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(
            "Wrote {} corpus embeddings ({} bytes) to {}",
            table.len(),
            bytes.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Header of the persisted file, `None` if there is no file
    pub async fn inspect(&self) -> Result<Option<CacheInfo>> {
        let bytes = match read_if_exists(&self.path).await? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let persisted: PersistedCache = serde_json::from_slice(&bytes)?;

        Ok(Some(CacheInfo {
            path: self.path.clone(),
            format_version: persisted.format_version,
            model: persisted.model,
            dimension: persisted.dimension,
            entries: persisted.records.len(),
            created_at: persisted.created_at,
            corpus_fingerprint: persisted.corpus_fingerprint,
        }))
    }

    /// Whether the persisted file no longer matches the corpus store
    ///
    /// Compares the recorded corpus fingerprint with one computed from a fresh
    /// snapshot. A missing file counts as stale. Never called by `load`.
    pub async fn is_stale(&self) -> Result<bool> {
        let info = match self.inspect().await? {
            Some(info) => info,
            None => return Ok(true),
        };
        let records = self.snapshot().await?;
        Ok(info.corpus_fingerprint != corpus_fingerprint(&records))
    }

    async fn snapshot(&self) -> Result<Vec<PaperRecord>> {
        self.store.snapshot().await.map_err(|e| match e {
            PaperSearchError::DataUnavailable { .. } => e,
            other => PaperSearchError::data_unavailable(format!(
                "Corpus store unreachable: {}",
                other
            )),
        })
    }

    async fn compute(&self) -> Result<CorpusEmbeddingTable> {
        let records = self.snapshot().await?;
        if records.is_empty() {
            return Err(PaperSearchError::data_unavailable(
                "Corpus store returned no papers",
            ));
        }

        info!(
            "Embedding {} papers with model {} in batches of {}",
            records.len(),
            self.provider.model_name(),
            self.batch_size
        );

        let texts: Vec<String> = records.iter().map(PaperRecord::embedding_text).collect();
        let embeddings = embed_in_batches(self.provider.as_ref(), &texts, self.batch_size).await?;

        if let (Some(expected), Some(first)) = (self.provider.dimension(), embeddings.first()) {
            if first.len() != expected {
                return Err(PaperSearchError::dimension_mismatch(expected, first.len()));
            }
        }

        CorpusEmbeddingTable::new(records, embeddings)
    }

    /// Decode the persisted file; `Ok(None)` when it is absent or corrupt
    async fn read_persisted(&self) -> Result<Option<CorpusEmbeddingTable>> {
        let bytes = match read_if_exists(&self.path).await? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        let persisted: PersistedCache = match serde_json::from_slice(&bytes) {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(
                    "Corpus embedding cache {} is unreadable ({}); rebuilding",
                    self.path.display(),
                    e
                );
                return Ok(None);
            }
        };

        if persisted.format_version != CACHE_FORMAT_VERSION {
            warn!(
                "Corpus embedding cache {} has format version {} (expected {}); rebuilding",
                self.path.display(),
                persisted.format_version,
                CACHE_FORMAT_VERSION
            );
            return Ok(None);
        }

        if persisted.model != self.provider.model_name() {
            return Err(PaperSearchError::model_mismatch(
                persisted.model,
                self.provider.model_name(),
            ));
        }

        if let Some(expected) = self.provider.dimension() {
            if expected != persisted.dimension {
                return Err(PaperSearchError::dimension_mismatch(
                    expected,
                    persisted.dimension,
                ));
            }
        }

        match decode_table(persisted) {
            Ok(table) => Ok(Some(table)),
            Err(reason) => {
                warn!(
                    "Corpus embedding cache {} is corrupt ({}); rebuilding",
                    self.path.display(),
                    reason
                );
                Ok(None)
            }
        }
    }
}

impl fmt::Debug for CorpusEmbeddingCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorpusEmbeddingCache")
            .field("path", &self.path)
            .field("model", &self.provider.model_name())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

fn decode_table(persisted: PersistedCache) -> std::result::Result<CorpusEmbeddingTable, String> {
    if persisted.records.len() != persisted.embeddings.len() {
        return Err(format!(
            "{} records but {} embeddings",
            persisted.records.len(),
            persisted.embeddings.len()
        ));
    }

    let embeddings = persisted
        .embeddings
        .iter()
        .enumerate()
        .map(|(i, encoded)| {
            decode_vector(encoded, persisted.dimension).map_err(|e| format!("entry {}: {}", i, e))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    CorpusEmbeddingTable::new(persisted.records, embeddings).map_err(|e| e.to_string())
}

fn encode_vector(vector: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    STANDARD.encode(bytes)
}

fn decode_vector(encoded: &str, dimension: usize) -> std::result::Result<EmbeddingVector, String> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| format!("invalid base64: {}", e))?;

    let expected = dimension
        .checked_mul(4)
        .ok_or_else(|| format!("dimension {} is out of range", dimension))?;
    if bytes.len() != expected {
        return Err(format!(
            "expected {} bytes for dimension {}, found {}",
            expected,
            dimension,
            bytes.len()
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

async fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
