//! Benchmarks for corpus-extract
//!
//! Run with: cargo bench

use corpus_extract::corpus::WorkSet;
use corpus_extract::dispatch::{self, Extractor};
use corpus_extract::error::PipelineResult;
use corpus_extract::pipeline::{Document, PatternPipeline, Pipeline, RecordModel, RecordSet};
use corpus_extract::progress::NullProgress;
use corpus_extract::store::MemoryStore;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Pipeline that does no work, so only dispatch overhead is measured
struct NoopPipeline;

impl Pipeline for NoopPipeline {
    fn parse(&self, path: &Path) -> PipelineResult<Document> {
        Ok(Document::new(path))
    }

    fn extract(&self, _document: &Document) -> PipelineResult<RecordSet> {
        Ok(RecordSet::new())
    }
}

fn work_set(n: usize) -> WorkSet {
    WorkSet::from_paths((0..n).map(|i| PathBuf::from(format!("/bench/doc{}.txt", i))))
}

fn benchmark_dispatch_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_1000_noop");

    for workers in [1usize, 2, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            b.iter(|| {
                let store = Arc::new(MemoryStore::new());
                let extractor = Extractor::new(Arc::new(NoopPipeline), store);
                let report = dispatch::run(work_set(1000), extractor, workers, &NullProgress).unwrap();
                black_box(report);
            })
        });
    }

    group.finish();
}

fn benchmark_pattern_extract(c: &mut Criterion) {
    let model = RecordModel::parse(r"temp=(?P<value>\d+)\s*°C").unwrap();
    let pipeline = PatternPipeline::new(vec![model]);

    let mut doc = Document::new("/bench/synthesis.txt");
    for i in 0..200 {
        doc.push_section(None, format!("Step {}: heated to {} °C for {} h.", i, 100 + i, i % 12));
    }

    c.bench_function("pattern_extract_200_sections", |b| {
        b.iter(|| {
            let records = pipeline.extract(black_box(&doc)).unwrap();
            black_box(records);
        })
    });
}

criterion_group!(benches, benchmark_dispatch_overhead, benchmark_pattern_extract);
criterion_main!(benches);
