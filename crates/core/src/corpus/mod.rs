//! Read-only access to the paper corpus

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryCorpusStore;
pub use sqlite::SqliteCorpusStore;

use crate::error::Result;
use crate::types::PaperRecord;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Source of paper records
///
/// Only full reads are supported. Ingestion happens elsewhere.
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Every record, in a stable order
    async fn snapshot(&self) -> Result<Vec<PaperRecord>>;
}

/// SHA-256 over the record ids joined by newlines, hex encoded
///
/// Identifies which corpus a cached embedding table was built from.
pub fn corpus_fingerprint(records: &[PaperRecord]) -> String {
    let mut hasher = Sha256::new();
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            hasher.update(b"\n");
        }
        hasher.update(record.id.as_bytes());
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
