//! In-memory corpus store, mainly for tests and small fixed corpora

use crate::corpus::CorpusStore;
use crate::error::Result;
use crate::types::PaperRecord;
use async_trait::async_trait;
use std::sync::RwLock;

/// Corpus held in a vector
#[derive(Debug, Default)]
pub struct InMemoryCorpusStore {
    records: RwLock<Vec<PaperRecord>>,
}

impl InMemoryCorpusStore {
    pub fn new(records: Vec<PaperRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Replace the stored records
    pub fn replace(&self, records: Vec<PaperRecord>) {
        match self.records.write() {
            Ok(mut guard) => *guard = records,
            Err(poisoned) => *poisoned.into_inner() = records,
        }
    }

    /// Load records from a JSON array of papers
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<PaperRecord> = serde_json::from_str(json)?;
        Ok(Self::new(records))
    }
}

#[async_trait]
impl CorpusStore for InMemoryCorpusStore {
    async fn snapshot(&self) -> Result<Vec<PaperRecord>> {
        let records = match self.records.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_and_replace() {
        let store = InMemoryCorpusStore::new(vec![PaperRecord::new("a", "A", "x")]);
        assert_eq!(store.snapshot().await.unwrap().len(), 1);

        store.replace(vec![
            PaperRecord::new("b", "B", "y"),
            PaperRecord::new("c", "C", "z"),
        ]);
        let ids: Vec<String> = store
            .snapshot()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_from_json() {
        let store = InMemoryCorpusStore::from_json(
            r#"[{"id":"p1","title":"T","abstract":"A","year":2020,"url":"u"}]"#,
        )
        .unwrap();
        let records = store.snapshot().await.unwrap();
        assert_eq!(records[0].year, Some(2020));
        assert_eq!(records[0].abstract_text, "A");
    }
}
