//! Performance benchmarks for mutation-kit key handling
//!
//! This benchmark suite measures:
//! - Decoding raw keys through each strategy
//! - Key stabilization (hit and change)
//! - Batch invalidation over caches of different sizes
//!
//! Run with: cargo bench
//! View results: open target/criterion/report/index.html

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mutation_kit::backend::InMemorySwrCache;
use mutation_kit::key::encode;
use mutation_kit::{by_group, decode, stabilize, BatchOptions, RawKey, StructuredKey};
use serde_json::json;
use std::hint::black_box;

// ============================================================================
// Benchmark Fixtures
// ============================================================================

fn user_key(n: usize) -> StructuredKey {
    StructuredKey::new(format!("user-{}", n), json!(format!("/api/users/{}", n)))
        .with_group(if n % 2 == 0 { "even" } else { "odd" })
}

// ============================================================================
// Decode Benchmarks
// ============================================================================

fn decode_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    let structured = RawKey::from(user_key(1));
    group.bench_function("structured", |b| {
        b.iter(|| decode(black_box(&structured)));
    });

    let legacy = RawKey::from(encode(&user_key(1)));
    group.bench_function("legacy", |b| {
        b.iter(|| decode(black_box(&legacy)));
    });

    let json = RawKey::from(r#"{"id":"user-1","group":"odd","data":"/api/users/1"}"#);
    group.bench_function("json", |b| {
        b.iter(|| decode(black_box(&json)));
    });

    let plain = RawKey::from("/api/users/1");
    group.bench_function("no_match", |b| {
        b.iter(|| decode(black_box(&plain)));
    });

    group.finish();
}

// ============================================================================
// Stabilize Benchmarks
// ============================================================================

fn stabilize_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("stabilize");

    let key = StructuredKey::new("feed", json!({ "url": "/api/feed", "page": 1, "tags": ["a", "b"] }));
    let previous = stabilize(Some(&key), None);
    let previous = previous.as_ref();

    group.bench_function("unchanged", |b| {
        b.iter(|| stabilize(black_box(Some(&key)), previous));
    });

    let changed = StructuredKey::new("feed", json!({ "url": "/api/feed", "page": 2, "tags": ["a", "b"] }));
    group.bench_function("changed", |b| {
        b.iter(|| stabilize(black_box(Some(&changed)), previous));
    });

    group.finish();
}

// ============================================================================
// Batch Benchmarks
// ============================================================================

fn batch_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");

    let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    for size in [10, 100, 1_000].iter() {
        let cache = InMemorySwrCache::new();
        for n in 0..*size {
            cache.insert(user_key(n), json!({ "n": n }));
        }

        group
            .throughput(Throughput::Elements(*size as u64))
            .bench_with_input(BenchmarkId::new("by_group", size), size, |b, _| {
                b.to_async(&rt).iter(|| async {
                    by_group(
                        &cache,
                        black_box("even"),
                        Some(json!(null)),
                        BatchOptions::default(),
                    )
                    .await
                    .expect("Batch update failed")
                });
            });
    }

    group.finish();
}

// ============================================================================
// Benchmark Registration
// ============================================================================

criterion_group!(
    benches,
    decode_benchmarks,
    stabilize_benchmarks,
    batch_benchmarks
);
criterion_main!(benches);
