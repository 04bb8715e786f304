//! Benchmarks for brute-force similarity ranking
//!
//! Measures a full linear scan at corpus sizes typical for a single-node
//! deployment, with and without a year filter.
//!
//! Run with: cargo bench --package papersearch-core --bench ranking_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use papersearch_core::search::{normalize, rank, rank_where};
use papersearch_core::{CorpusEmbeddingTable, PaperRecord};

/// Deterministic values in [-1, 1) from a linear congruential sequence
fn pseudo_random_vector(seed: u64, dimension: usize) -> Vec<f32> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..dimension)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
        })
        .collect()
}

fn build_table(size: usize, dimension: usize) -> CorpusEmbeddingTable {
    let records = (0..size)
        .map(|i| {
            PaperRecord::new(format!("paper-{}", i), format!("Paper {}", i), "abstract")
                .with_year(1990 + (i % 35) as i32)
        })
        .collect();
    let embeddings = (0..size)
        .map(|i| pseudo_random_vector(i as u64, dimension))
        .collect();
    // Inputs are well-formed by construction
    CorpusEmbeddingTable::new(records, embeddings).unwrap()
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");

    for &(size, dimension) in &[(1_000, 384), (10_000, 384), (10_000, 768)] {
        let table = build_table(size, dimension);
        let query = pseudo_random_vector(u64::MAX, dimension);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::new("top5", format!("{}x{}", size, dimension)),
            &table,
            |b, table| b.iter(|| rank(black_box(&query), black_box(table), 5)),
        );
    }

    group.finish();
}

fn bench_rank_where(c: &mut Criterion) {
    let table = build_table(10_000, 384);
    let query = pseudo_random_vector(7, 384);

    c.bench_function("rank_where_year_filter_10000x384", |b| {
        b.iter(|| {
            rank_where(black_box(&query), black_box(&table), 10, |r| {
                r.year.map_or(false, |y| y >= 2015)
            })
        })
    });
}

fn bench_normalize(c: &mut Criterion) {
    let vector = pseudo_random_vector(42, 768);
    c.bench_function("normalize_768", |b| b.iter(|| normalize(black_box(&vector))));
}

criterion_group!(benches, bench_rank, bench_rank_where, bench_normalize);
criterion_main!(benches);
