use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ioperf::{BufferKind, FileSource, NullSink, PipelineBuilder};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

const FILE_BYTES: usize = 8 * 1024 * 1024;

fn input_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Temp file failed");
    let block: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    for _ in 0..FILE_BYTES / block.len() {
        file.write_all(&block).expect("Write failed");
    }
    file.flush().expect("Flush failed");
    file
}

/// A one-shot file drained through a chain of small buffers: every stage
/// spends most of its time blocked on a neighbor.
fn benchmark_small_buffer_chain(c: &mut Criterion) {
    let input = input_file();
    let mut group = c.benchmark_group("file_to_null_chain");
    group.throughput(Throughput::Bytes(FILE_BYTES as u64));

    for (kind, label) in [(BufferKind::Fixed, "fixed"), (BufferKind::Circular, "circular")] {
        for capacity in [64usize, 4096, 256 * 1024] {
            group.bench_with_input(BenchmarkId::new(label, capacity), &capacity, |b, &cap| {
                b.iter(|| {
                    let running = PipelineBuilder::<u8>::new()
                        .source(Arc::new(FileSource::<u8>::open_once(input.path()).expect("Source failed")))
                        .add_buffer(kind, cap)
                        .add_buffer(kind, cap)
                        .sink(Arc::new(NullSink::<u8>::new()))
                        .chunk_size(16 * 1024)
                        .build()
                        .expect("Build failed")
                        .start()
                        .expect("Start failed");
                    running.wait().expect("Wait failed")
                });
            });
        }
    }

    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(15))
        .sample_size(20);
    targets = benchmark_small_buffer_chain
);
criterion_main!(benches);
