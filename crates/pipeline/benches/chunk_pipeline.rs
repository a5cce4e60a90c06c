use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use batchrun_core::{BatchResult, ExecutionTree, Parameters};
use batchrun_pipeline::{ChunkPipelineJob, Component, FnProcessor, ItemWriter, IterReader, run_job};

/// Writer that only counts, so the benchmark measures the pipeline itself.
#[derive(Debug, Default)]
struct CountingWriter {
    items: usize,
}

impl Component for CountingWriter {}

impl ItemWriter for CountingWriter {
    type Item = u64;

    fn write(&mut self, batch: Vec<u64>) -> BatchResult<()> {
        self.items += black_box(batch).len();
        Ok(())
    }
}

fn bench_chunk_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_pipeline_throughput");
    let item_count = 10_000u64;
    group.throughput(Throughput::Elements(item_count));

    for chunk_size in [1usize, 10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let mut job = ChunkPipelineJob::new(
                        IterReader::new(0..item_count),
                        CountingWriter::default(),
                        chunk_size,
                    )
                    .unwrap();
                    let mut tree = ExecutionTree::new("bench", Parameters::new());
                    let root = tree.root();
                    run_job(&mut job, &mut tree, root).unwrap();
                    black_box(job.writer().items)
                });
            },
        );
    }

    group.finish();
}

fn bench_with_processor(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_pipeline_processor");
    let item_count = 10_000u64;
    group.throughput(Throughput::Elements(item_count));

    group.bench_function("filter_half", |b| {
        b.iter(|| {
            let evens = FnProcessor::new(|n: u64| Ok((n % 2 == 0).then_some(n)));
            let mut job = ChunkPipelineJob::with_processor(
                IterReader::new(0..item_count),
                evens,
                CountingWriter::default(),
                100,
            )
            .unwrap();
            let mut tree = ExecutionTree::new("bench", Parameters::new());
            let root = tree.root();
            run_job(&mut job, &mut tree, root).unwrap();
            black_box(job.writer().items)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_chunk_sizes, bench_with_processor);
criterion_main!(benches);
