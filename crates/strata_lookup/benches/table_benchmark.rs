//! # Table Benchmark
//!
//! Insert and lookup throughput of the fixed tables against `std` maps, and
//! interning hit rate on a warm string table.

#![allow(missing_docs)]

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use strata_core::SystemAllocator;
use strata_lookup::{Dictionary, LookupTable, StringTable};

const KEYS: usize = 1000;

fn names() -> Vec<String> {
    (0..KEYS).map(|i| format!("assets/blocks/block_{i:04}.png")).collect()
}

fn bench_lookup_table(c: &mut Criterion) {
    let names = names();
    let mut table: LookupTable<u32, 11> = LookupTable::new(SystemAllocator::instance());
    for (i, name) in names.iter().enumerate() {
        table.insert(name.as_bytes(), i as u32);
    }

    c.bench_function("lookup_table_hit_1000", |b| {
        b.iter(|| {
            let mut sum = 0u32;
            for name in &names {
                sum = sum.wrapping_add(table.lookup(name.as_bytes()).unwrap_or(0));
            }
            black_box(sum)
        });
    });
}

fn bench_std_hash_map(c: &mut Criterion) {
    let names = names();
    let map: HashMap<&str, u32> = names.iter().enumerate().map(|(i, n)| (n.as_str(), i as u32)).collect();

    c.bench_function("std_hash_map_hit_1000", |b| {
        b.iter(|| {
            let mut sum = 0u32;
            for name in &names {
                sum = sum.wrapping_add(map.get(name.as_str()).copied().unwrap_or(0));
            }
            black_box(sum)
        });
    });
}

fn bench_intern_warm(c: &mut Criterion) {
    let names = names();
    let mut strings = StringTable::with_capacity(1 << 20, 12);
    for name in &names {
        strings.intern(name);
    }

    c.bench_function("string_table_intern_warm_1000", |b| {
        b.iter(|| {
            for name in &names {
                black_box(strings.intern(name));
            }
        });
    });
}

fn bench_dictionary(c: &mut Criterion) {
    let names = names();
    let mut strings = StringTable::with_capacity(1 << 20, 12);
    let handles: Vec<_> = names.iter().map(|n| strings.intern(n)).collect();
    let mut dict = Dictionary::new(SystemAllocator::instance());
    for (i, &h) in handles.iter().enumerate() {
        dict.insert(h, i);
    }

    c.bench_function("dictionary_hit_1000", |b| {
        b.iter(|| {
            let mut sum = 0usize;
            for &h in &handles {
                sum += dict.lookup(h).copied().unwrap_or(0);
            }
            black_box(sum)
        });
    });
}

criterion_group!(
    benches,
    bench_lookup_table,
    bench_std_hash_map,
    bench_intern_warm,
    bench_dictionary
);
criterion_main!(benches);
