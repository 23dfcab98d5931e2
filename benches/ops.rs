//! Micro-operation benchmarks for the ticket queue.
//!
//! Run with: `cargo bench --bench ops`
//!
//! Measures per-operation latency for raise (new item and promotion),
//! dequeue and peek, on the bare engine and through the shared handle.

use std::hint::black_box;
use std::time::Instant;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ticketkit::queue::PriorityQueue;
use ticketkit::shared::SharedQueue;

const ITEMS: i64 = 16_384;
const OPS: u64 = 100_000;

fn filled(items: i64, max_delta: i64) -> PriorityQueue {
    let mut rng = StdRng::seed_from_u64(42);
    let mut queue = PriorityQueue::with_capacity(items as usize);
    for item in 1..=items {
        queue.raise(item, rng.gen_range(1..=max_delta)).unwrap();
    }
    queue
}

// ============================================================================
// Raise
// ============================================================================

fn bench_raise(c: &mut Criterion) {
    let mut group = c.benchmark_group("raise_ns");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("enqueue_new", |b| {
        b.iter_custom(|iters| {
            let mut elapsed = std::time::Duration::ZERO;
            for _ in 0..iters {
                let mut queue = PriorityQueue::with_capacity(OPS as usize);
                let start = Instant::now();
                for item in 1..=OPS as i64 {
                    black_box(queue.raise(item, (item % 64) + 1).unwrap());
                }
                elapsed += start.elapsed();
            }
            elapsed
        })
    });

    // Few hot items climbing through many scores.
    group.bench_function("promote_hot", |b| {
        b.iter_custom(|iters| {
            let mut queue = filled(64, 8);
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS as i64 {
                    black_box(queue.raise(i % 64 + 1, 1).unwrap());
                }
            }
            start.elapsed()
        })
    });

    // Random promotions across a wide queue.
    group.bench_function("promote_random", |b| {
        b.iter_custom(|iters| {
            let mut queue = filled(ITEMS, 1_000);
            let mut rng = StdRng::seed_from_u64(7);
            let start = Instant::now();
            for _ in 0..iters {
                for _ in 0..OPS {
                    let item = rng.gen_range(1..=ITEMS);
                    black_box(queue.raise(item, rng.gen_range(1..=16)).unwrap());
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

// ============================================================================
// Dequeue / Peek
// ============================================================================

fn bench_dequeue(c: &mut Criterion) {
    let mut group = c.benchmark_group("dequeue_ns");
    group.throughput(Throughput::Elements(ITEMS as u64));

    group.bench_function("drain", |b| {
        b.iter_custom(|iters| {
            let mut elapsed = std::time::Duration::ZERO;
            for _ in 0..iters {
                let mut queue = filled(ITEMS, 1_000);
                let start = Instant::now();
                while let Some(item) = queue.dequeue_max() {
                    black_box(item);
                }
                elapsed += start.elapsed();
            }
            elapsed
        })
    });

    group.bench_function("peek", |b| {
        let queue = filled(ITEMS, 1_000);
        b.iter(|| black_box(queue.peek_max()))
    });

    group.bench_function("lookup_score", |b| {
        let queue = filled(ITEMS, 1_000);
        let mut item = 0i64;
        b.iter(|| {
            item = item % ITEMS + 1;
            black_box(queue.lookup_score(item))
        })
    });

    group.finish();
}

// ============================================================================
// Through the lock
// ============================================================================

fn bench_shared(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_ns");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("raise_then_next", |b| {
        b.iter_custom(|iters| {
            let queue = SharedQueue::from_queue(filled(1_024, 32));
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS as i64 {
                    queue.raise(i % 2_048 + 1, 3).unwrap();
                    black_box(queue.dequeue_max());
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_raise, bench_dequeue, bench_shared);
criterion_main!(benches);
