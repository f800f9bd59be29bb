use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use poolctl_core::{LockTracker, PoolRegistry};

fn locked_prefix(size: i64, locked: i64) -> LockTracker {
    let tracker = LockTracker::new("BENCH", size).unwrap();
    for id in 1..=locked {
        tracker.lock(id).unwrap();
    }
    tracker
}

fn bench_first_unlocked(c: &mut Criterion) {
    let mut group = c.benchmark_group("LockTracker::first_unlocked_id");
    for size in [1_000i64, 100_000, 1_000_000] {
        // Worst case for a linear scan: the only free id is the last one.
        let tracker = locked_prefix(size, size - 1);
        group.bench_with_input(BenchmarkId::from_parameter(size), &tracker, |b, tracker| {
            b.iter(|| black_box(tracker.first_unlocked_id()));
        });
    }
    group.finish();
}

fn bench_first_bigger_unlocked(c: &mut Criterion) {
    let size = 1_000_000i64;
    let tracker = locked_prefix(size, size - 1);

    c.bench_function("LockTracker::first_bigger_unlocked_id", |b| {
        b.iter(|| black_box(tracker.first_bigger_unlocked_id(black_box(17)).unwrap()));
    });
}

fn bench_claim_cycle(c: &mut Criterion) {
    let registry = PoolRegistry::new();
    registry.put_pool("bench", 100_000).unwrap();
    for id in 1..=50_000 {
        registry.lock("bench", id).unwrap();
    }

    c.bench_function("PoolRegistry::claim_release", |b| {
        b.iter(|| {
            let id = registry.first_unlocked_id("bench").unwrap();
            registry.lock("bench", id).unwrap();
            registry.unlock("bench", id).unwrap();
            black_box(id)
        });
    });
}

fn bench_growth(c: &mut Criterion) {
    c.bench_function("LockTracker::lock_with_growth", |b| {
        b.iter(|| {
            let tracker = LockTracker::new("GROW", 1).unwrap();
            for id in (1..=100_000i64).step_by(97) {
                tracker.lock(id).unwrap();
            }
            black_box(tracker.max_id())
        });
    });
}

criterion_group!(
    benches,
    bench_first_unlocked,
    bench_first_bigger_unlocked,
    bench_claim_cycle,
    bench_growth
);
criterion_main!(benches);
