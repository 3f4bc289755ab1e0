//! # Allocator Benchmark
//!
//! Compares building a frame's scratch data on the system heap against a
//! reset-per-frame arena, plus block pool churn.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use strata_core::{
    megabytes, Allocator, ArenaAllocator, BlockAllocator, DynArray, SystemAllocator,
};

const ELEMENTS: u32 = 10_000;

fn bench_dyn_array_heap(c: &mut Criterion) {
    c.bench_function("dyn_array_push_10k_heap", |b| {
        b.iter(|| {
            let mut array = DynArray::new(SystemAllocator::instance());
            for i in 0..ELEMENTS {
                array.push(i);
            }
            black_box(array.len())
        });
    });
}

fn bench_dyn_array_arena(c: &mut Criterion) {
    let mut arena = ArenaAllocator::new(SystemAllocator::instance(), megabytes(1));
    c.bench_function("dyn_array_push_10k_arena", |b| {
        b.iter(|| {
            let len = {
                let mut array = DynArray::new(&arena);
                for i in 0..ELEMENTS {
                    array.push(i);
                }
                array.len()
            };
            arena.reset();
            black_box(len)
        });
    });
}

fn bench_arena_small_allocations(c: &mut Criterion) {
    let mut arena = ArenaAllocator::new(SystemAllocator::instance(), megabytes(1));
    c.bench_function("arena_allocate_32b_x1000", |b| {
        b.iter(|| {
            for _ in 0..1000 {
                black_box(arena.allocate(32, 8));
            }
            arena.reset();
        });
    });
}

fn bench_block_churn(c: &mut Criterion) {
    let mut pool: BlockAllocator<[u64; 8]> = BlockAllocator::new(SystemAllocator::instance(), 1024);
    let mut handles = Vec::with_capacity(1024);
    c.bench_function("block_alloc_free_1024", |b| {
        b.iter(|| {
            while let Some(handle) = pool.allocate_block() {
                handles.push(handle);
            }
            for handle in handles.drain(..).rev() {
                pool.deallocate_block(handle);
            }
            black_box(pool.free_count())
        });
    });
}

criterion_group!(
    benches,
    bench_dyn_array_heap,
    bench_dyn_array_arena,
    bench_arena_small_allocations,
    bench_block_churn
);
criterion_main!(benches);
