//! FMM Allocation Benchmarks
//!
//! Hot-path costs of the allocation manager in both header configurations.
//! Run with: `cargo bench --package fmm`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fmm::{make_array, Allocator, ClassId, Collector, MemConfig, NoCollector, RecordingCollector};

const BENCH_CLASS: ClassId = ClassId::new(64);

fn create_alloc<C: Collector + Default>() -> Allocator<C> {
    Allocator::with_config(MemConfig {
        initial_pages: 64,
        max_pages: 4096,
        ..Default::default()
    })
    .unwrap()
}

fn bench_allocate_discard(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_discard");

    for size in [8usize, 64, 512, 4096] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut alloc = create_alloc::<NoCollector>();
            b.iter(|| {
                let obj = alloc.allocate(black_box(size)).unwrap();
                alloc.discard(obj).unwrap();
            })
        });
    }

    group.finish();
}

fn bench_register(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_register");

    group.bench_function("no_collector", |b| {
        b.iter_batched(
            create_alloc::<NoCollector>,
            |mut alloc| {
                for _ in 0..256 {
                    let obj = alloc.allocate(24).unwrap();
                    black_box(alloc.register(obj, BENCH_CLASS).unwrap());
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.bench_function("recording_collector", |b| {
        b.iter_batched(
            create_alloc::<RecordingCollector>,
            |mut alloc| {
                for _ in 0..256 {
                    let obj = alloc.allocate(24).unwrap();
                    black_box(alloc.register(obj, BENCH_CLASS).unwrap());
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_reallocate(c: &mut Criterion) {
    let mut group = c.benchmark_group("reallocate");

    group.bench_function("in_place_cycle", |b| {
        let mut alloc = create_alloc::<NoCollector>();
        let mut obj = Some(alloc.allocate(100).unwrap());
        b.iter(|| {
            let shrunk = alloc.reallocate(obj.take().unwrap(), 70).unwrap();
            obj = Some(alloc.reallocate(shrunk, black_box(100)).unwrap());
        })
    });

    group.bench_function("grow_doubling", |b| {
        let mut alloc = create_alloc::<NoCollector>();
        b.iter(|| {
            let mut obj = alloc.allocate(8).unwrap();
            for size in [16, 32, 64, 128, 256, 512, 1024] {
                obj = alloc.reallocate(obj, size).unwrap();
            }
            alloc.discard(obj).unwrap();
        })
    });

    group.finish();
}

fn bench_make_array(c: &mut Criterion) {
    c.bench_function("make_array_16xi32", |b| {
        b.iter_batched(
            create_alloc::<RecordingCollector>,
            |mut alloc| black_box(make_array(&mut alloc, 16, BENCH_CLASS, 2, None).unwrap()),
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_allocate_discard,
    bench_register,
    bench_reallocate,
    bench_make_array
);
criterion_main!(benches);
