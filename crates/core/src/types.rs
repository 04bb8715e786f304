//! Core type definitions for PaperSearch

use crate::error::{PaperSearchError, Result};
use serde::{Deserialize, Serialize};

/// Dense embedding vector produced by an embedding provider
///
/// Two vectors are only comparable when they come from the same provider and
/// model. Ranking checks dimensions but cannot check model identity.
pub type EmbeddingVector = Vec<f32>;

/// A single research paper as read from the corpus store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Stable paper identifier
    pub id: String,
    /// Paper title
    pub title: String,
    /// Abstract text
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Publication year, when known
    #[serde(default)]
    pub year: Option<i32>,
    /// Link to the paper
    #[serde(default)]
    pub url: String,
}

impl PaperRecord {
    /// Create a record without year or url
    pub fn new<I, T, A>(id: I, title: T, abstract_text: A) -> Self
    where
        I: Into<String>,
        T: Into<String>,
        A: Into<String>,
    {
        Self {
            id: id.into(),
            title: title.into(),
            abstract_text: abstract_text.into(),
            year: None,
            url: String::new(),
        }
    }

    /// Set the publication year
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Set the paper url
    pub fn with_url<S: Into<String>>(mut self, url: S) -> Self {
        self.url = url.into();
        self
    }

    /// Text fed to the embedding provider: title and abstract joined by a space
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text)
    }
}

/// Inclusive publication-year filter
///
/// A record without a year never matches a range that sets either bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

impl YearRange {
    /// Create a new year range
    pub fn new(min: Option<i32>, max: Option<i32>) -> Result<Self> {
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(PaperSearchError::invalid_request(format!(
                    "year_min ({}) must not be greater than year_max ({})",
                    min, max
                )));
            }
        }
        Ok(Self { min, max })
    }

    /// True when neither bound is set
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Check whether a record's year falls inside the range
    pub fn contains(&self, year: Option<i32>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        match year {
            Some(year) => {
                self.min.map_or(true, |min| year >= min) && self.max.map_or(true, |max| year <= max)
            }
            None => false,
        }
    }
}

/// Corpus records paired position-by-position with their embeddings
///
/// `records[i]` corresponds to `embeddings[i]`. The table is immutable once
/// built and is shared read-only across requests.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusEmbeddingTable {
    records: Vec<PaperRecord>,
    embeddings: Vec<EmbeddingVector>,
}

impl CorpusEmbeddingTable {
    /// Build a table, checking the parallel-array invariant
    ///
    /// # Errors
    ///
    /// Returns `PaperSearchError::Validation` if the two sequences differ in
    /// length, or `PaperSearchError::DimensionMismatch` if the embeddings do
    /// not all share one dimension.
    pub fn new(records: Vec<PaperRecord>, embeddings: Vec<EmbeddingVector>) -> Result<Self> {
        if records.len() != embeddings.len() {
            return Err(PaperSearchError::validation(format!(
                "{} records but {} embeddings",
                records.len(),
                embeddings.len()
            )));
        }

        if let Some(first) = embeddings.first() {
            let expected = first.len();
            if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
                return Err(PaperSearchError::dimension_mismatch(expected, bad.len()));
            }
        }

        Ok(Self {
            records,
            embeddings,
        })
    }

    /// Records in corpus order
    pub fn records(&self) -> &[PaperRecord] {
        &self.records
    }

    /// Embeddings in corpus order
    pub fn embeddings(&self) -> &[EmbeddingVector] {
        &self.embeddings
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the table holds no entries
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Embedding dimension, `None` for an empty table
    pub fn dimension(&self) -> Option<usize> {
        self.embeddings.first().map(Vec::len)
    }

    /// Iterate over `(record, embedding)` pairs in corpus order
    pub fn iter(&self) -> impl Iterator<Item = (&PaperRecord, &EmbeddingVector)> {
        self.records.iter().zip(self.embeddings.iter())
    }
}
