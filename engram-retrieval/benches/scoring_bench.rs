//! Scoring throughput over synthetic candidate pools.

use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use engram_core::config::StrategyWeights;
use engram_core::models::{MemoryLayer, Provenance};
use engram_retrieval::scoring::{rank, Candidate};

fn make_candidates(n: usize) -> Vec<Candidate> {
    let now = Utc::now();
    (0..n)
        .map(|i| Candidate {
            memory_id: format!("m{i}"),
            layer: MemoryLayer::Semantic,
            original_text: format!("candidate {i}"),
            entities: vec![format!("e{}", i % 7)],
            created_at: now - Duration::days((i % 365) as i64),
            importance: (i % 100) as f64 / 100.0,
            reinforcement_count: (i % 8) as u32,
            similarity: ((i * 37) % 100) as f64 / 100.0,
            effective_confidence: (i % 100) as f64 / 100.0,
            provenance: Provenance::default(),
        })
        .collect()
}

fn bench_rank(c: &mut Criterion) {
    let weights = StrategyWeights::default();
    let query: Vec<String> = (0..3).map(|i| format!("e{i}")).collect();
    for n in [100usize, 1_000, 10_000] {
        c.bench_with_input(BenchmarkId::new("rank", n), &n, |b, &n| {
            let candidates = make_candidates(n);
            b.iter(|| {
                rank(candidates.clone(), &query, Utc::now(), &weights)
            })
        });
    }
}

criterion_group!(benches, bench_rank);
criterion_main!(benches);
