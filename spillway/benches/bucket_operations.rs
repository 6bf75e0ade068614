use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use spillway::{Bucket, BucketConfig, LocalAdapter, ManualClock, MemoryAdapter};
use std::hint::black_box;
use std::time::Duration;

fn benchmark_bucket_arithmetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucket_arithmetic");
    group.throughput(Throughput::Elements(1));
    group.measurement_time(Duration::from_secs(10));

    // Leak then fill, the usual request path
    group.bench_function("leak_and_fill", |b| {
        let adapter = MemoryAdapter::new();
        let clock = ManualClock::new(0);
        let config = BucketConfig::new(1_000, 60_000).unwrap();
        let mut bucket = Bucket::with_clock("bench", &adapter, config, &clock).unwrap();

        b.iter(|| {
            clock.advance(1);
            bucket.leak();
            black_box(bucket.fill(black_box(1), false).is_ok())
        });
    });

    // Rejected fills on a full bucket (worst case)
    group.bench_function("fill_rejected", |b| {
        let adapter = MemoryAdapter::new();
        let clock = ManualClock::new(0);
        let config = BucketConfig::new(10, 1).unwrap();
        let mut bucket = Bucket::with_clock("full", &adapter, config, &clock).unwrap();
        bucket.fill(10, false).unwrap();

        b.iter(|| black_box(bucket.fill(black_box(1), false).is_err()));
    });

    group.bench_function("capacity_queries", |b| {
        let adapter = MemoryAdapter::new();
        let clock = ManualClock::new(0);
        let mut bucket =
            Bucket::with_clock("query", &adapter, BucketConfig::default(), &clock).unwrap();
        bucket.fill(7, false).unwrap();

        b.iter(|| {
            black_box(bucket.has_capacity(black_box(2)));
            black_box(bucket.seconds_until_capacity(black_box(5)));
            black_box(bucket.seconds_until_empty())
        });
    });

    group.finish();
}

fn benchmark_persistence(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucket_persistence");
    group.throughput(Throughput::Elements(1));

    group.bench_function("memory_save_and_load", |b| {
        let adapter = MemoryAdapter::new();
        let mut counter = 0u64;

        b.iter(|| {
            let id = format!("key_{}", counter % 100);
            counter += 1;

            let mut bucket =
                Bucket::new(black_box(id.as_str()), &adapter, BucketConfig::default()).unwrap();
            bucket.leak().fill(1, true).unwrap();
            bucket.set_data("last.request", counter);
            bucket.save().unwrap();
        });
    });

    group.bench_function("local_save_and_load", |b| {
        let dir = tempfile::tempdir().unwrap();
        let adapter = LocalAdapter::new(dir.path());

        b.iter(|| {
            let mut bucket = Bucket::new("file_key", &adapter, BucketConfig::default()).unwrap();
            bucket.leak().fill(1, true).unwrap();
            bucket.overflow().save().unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_bucket_arithmetic, benchmark_persistence);
criterion_main!(benches);
