use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ioperf::{CircularBuffer, FixedBuffer};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TOTAL_WORDS: usize = 4 * 1024 * 1024;
const CHUNK: usize = 64 * 1024;

/// Push TOTAL_WORDS through a buffer with a producer and a consumer thread
macro_rules! transfer {
    ($buffer:expr) => {{
        let buffer = Arc::new($buffer);
        let producer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let chunk = vec![0xa5u8; CHUNK];
                let mut sent = 0;
                while sent < TOTAL_WORDS {
                    let want = (TOTAL_WORDS - sent).min(CHUNK);
                    sent += buffer.write(&chunk[..want]);
                }
            })
        };

        let mut chunk = vec![0u8; CHUNK];
        let mut received = 0;
        while received < TOTAL_WORDS {
            received += buffer.read(black_box(&mut chunk));
        }
        producer.join().expect("Producer panicked");
        received
    }};
}

fn benchmark_buffer_transfer(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_transfer");
    group.throughput(Throughput::Bytes(TOTAL_WORDS as u64));

    for capacity in [4 * 1024, 256 * 1024, 1024 * 1024] {
        group.bench_with_input(BenchmarkId::new("fixed", capacity), &capacity, |b, &cap| {
            b.iter(|| transfer!(FixedBuffer::<u8>::new(cap).expect("Buffer failed")));
        });
        group.bench_with_input(BenchmarkId::new("circular", capacity), &capacity, |b, &cap| {
            b.iter(|| transfer!(CircularBuffer::<u8>::new(cap).expect("Buffer failed")));
        });
    }

    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = benchmark_buffer_transfer
);
criterion_main!(benches);
