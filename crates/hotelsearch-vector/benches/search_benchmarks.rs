//! Benchmarks for the exhaustive linear-scan search path.
//!
//! Uses 5,000 synthetic hotels by default. Set `BENCH_FULL_SCALE=1` to run
//! against 50,000, the upper end of what a linear scan is meant to serve:
//!
//! ```bash
//! BENCH_FULL_SCALE=1 cargo bench -p hotelsearch-vector
//! ```

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use hotelsearch_core::types::{Record, RecordId};
use hotelsearch_vector::{
    cosine_similarity, CatalogStore, EmbeddingService, IngestionPipeline, MockEmbedding,
    SearchEngine, TextProjector,
};

const CI_HOTEL_COUNT: usize = 5_000;
const FULL_SCALE_HOTEL_COUNT: usize = 50_000;

fn hotel_count() -> usize {
    if std::env::var("BENCH_FULL_SCALE").is_ok() {
        FULL_SCALE_HOTEL_COUNT
    } else {
        CI_HOTEL_COUNT
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime")
}

fn synthetic_hotel(index: usize) -> Record {
    let cities = ["Paris", "Bali", "Lisbon", "Kyoto", "Cusco"];
    Record::new(RecordId::new(format!("H{:06}", index)).expect("valid id"))
        .with_field("HotelName", format!("Hotel {}", index))
        .with_field(
            "Description",
            "Comfortable rooms close to the old town with breakfast included",
        )
        .with_field("HotelFacilities", vec!["Wifi", "Pool", "Spa"])
        .with_field("CityName", cities[index % cities.len()])
}

/// Build a catalog of `count` hotels with mock embeddings attached.
fn build_catalog(rt: &tokio::runtime::Runtime, count: usize) -> CatalogStore {
    let store = CatalogStore::new();
    for i in 0..count {
        store.upsert(synthetic_hotel(i)).expect("upsert failed");
    }
    let pipeline = IngestionPipeline::new(MockEmbedding::new(), TextProjector::default());
    let report = rt
        .block_on(pipeline.sync(&store, false))
        .expect("ingestion failed");
    assert_eq!(report.succeeded, count, "every hotel should be embedded");
    store
}

fn bench_cosine(c: &mut Criterion) {
    let rt = runtime();
    let embedder = MockEmbedding::new();
    let a = rt.block_on(embedder.embed("seaside resort")).expect("embed failed");
    let b = rt.block_on(embedder.embed("mountain lodge")).expect("embed failed");

    c.bench_function("cosine_512d", |bench| {
        bench.iter(|| cosine_similarity(&a, &b).expect("cosine failed"))
    });
}

fn bench_linear_scan(c: &mut Criterion) {
    let rt = runtime();
    let count = hotel_count();
    let store = build_catalog(&rt, count);
    let engine = SearchEngine::new(store, MockEmbedding::new());

    let mut group = c.benchmark_group("linear_scan");
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(10));

    for top_k in [5usize, 50] {
        group.bench_with_input(
            BenchmarkId::new(format!("{}hotels", count), top_k),
            &top_k,
            |b, &top_k| {
                b.iter(|| {
                    let hits = rt
                        .block_on(engine.search("spa hotel in Paris", top_k))
                        .expect("search failed");
                    assert_eq!(hits.len(), top_k);
                    hits
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_cosine, bench_linear_scan);
criterion_main!(benches);
