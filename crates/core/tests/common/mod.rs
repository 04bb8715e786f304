//! Test doubles shared by the core integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use papersearch_core::{
    CorpusStore, EmbeddingProvider, EmbeddingVector, PaperRecord, PaperSearchError, Result,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Deterministic provider that records every call
pub struct CountingProvider {
    model: String,
    dimension: Option<usize>,
    calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
    fail: AtomicBool,
    short_by_one: AtomicBool,
    delay: Option<Duration>,
}

impl CountingProvider {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            dimension: None,
            calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            short_by_one: AtomicBool::new(false),
            delay: None,
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_calls(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn drop_one_vector(&self, drop: bool) {
        self.short_by_one.store(drop, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }
}

/// Four-dimensional vector derived from the text, with fractional parts that
/// do not round-trip through decimal formatting cleanly
pub fn embed_text(text: &str) -> EmbeddingVector {
    let len = text.len() as f32;
    let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count() as f32;
    let first = text.bytes().next().unwrap_or(0) as f32;
    vec![len / 7.0, vowels / 3.0, first / 11.0, 1.0 / (len + 1.0)]
}

#[async_trait]
impl EmbeddingProvider for CountingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().unwrap().push(texts.len());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(PaperSearchError::provider("quota exceeded"));
        }

        let mut vectors: Vec<EmbeddingVector> = texts.iter().map(|t| embed_text(t)).collect();
        if self.short_by_one.load(Ordering::SeqCst) {
            vectors.pop();
        }
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

/// Store that is always unreachable
pub struct UnreachableStore;

#[async_trait]
impl CorpusStore for UnreachableStore {
    async fn snapshot(&self) -> Result<Vec<PaperRecord>> {
        Err(PaperSearchError::network("connection refused"))
    }
}

pub fn sample_papers(n: usize) -> Vec<PaperRecord> {
    (0..n)
        .map(|i| {
            PaperRecord::new(
                format!("paper-{}", i),
                format!("Title number {}", i),
                format!("An abstract about topic {}. {}", i, "More detail here. ".repeat(i)),
            )
            .with_year(2000 + i as i32)
            .with_url(format!("https://papers.example.org/{}", i))
        })
        .collect()
}
