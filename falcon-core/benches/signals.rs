//! Benchmarks for signal propagation and keyed list reconciliation
//!
//! Run with: cargo bench -p falcon-core --bench signals

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use falcon_core::dom::Node;
use falcon_core::flow::{create_for, Keyed};
use falcon_core::reactive::Runtime;
use std::hint::black_box;

#[derive(Clone)]
struct Row(u32);

impl Keyed for Row {
    type Key = u32;

    fn key(&self) -> u32 {
        self.0
    }
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal/fan_out");

    for observers in [1usize, 10, 100, 1000] {
        group.throughput(Throughput::Elements(observers as u64));
        let runtime = Runtime::new();
        let (source, set_source) = runtime.create_signal(0u64);
        for _ in 0..observers {
            let source = source.clone();
            runtime.create_effect(move || {
                black_box(source.get());
            });
        }
        runtime.flush();

        let mut next = 0u64;
        group.bench_with_input(BenchmarkId::new("set", observers), &(), |b, _| {
            b.iter(|| {
                next += 1;
                set_source.set(next);
            })
        });
    }

    group.finish();
}

fn bench_memo_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("memo/chain");

    for depth in [1usize, 10, 50] {
        let runtime = Runtime::new();
        let (source, set_source) = runtime.create_signal(0u64);
        let mut tail = runtime.create_memo(move || source.get());
        for _ in 1..depth {
            let previous = tail.clone();
            tail = runtime.create_memo(move || previous.get() + 1);
        }
        runtime.flush();

        let mut next = 0u64;
        group.bench_with_input(BenchmarkId::new("set", depth), &(), |b, _| {
            b.iter(|| {
                next += 1;
                set_source.set(next);
                black_box(tail.get_untracked())
            })
        });
    }

    group.finish();
}

fn bench_list_reorder(c: &mut Criterion) {
    let mut group = c.benchmark_group("for/reverse");

    for len in [10u32, 100, 1000] {
        group.throughput(Throughput::Elements(u64::from(len)));
        let runtime = Runtime::new();
        let forward: Vec<Row> = (0..len).map(Row).collect();
        let reversed: Vec<Row> = forward.iter().rev().cloned().collect();
        let (rows, set_rows) = runtime.create_always_signal(forward.clone());

        let list = Node::element("ul");
        list.append_child(&create_for(&runtime, move || rows.get(), |row: &Row, _| {
            let item = Node::element("li");
            item.set_text_content(row.0.to_string());
            item
        }))
        .expect("list region mounts");
        runtime.flush();

        let mut flip = false;
        group.bench_with_input(BenchmarkId::new("set", len), &(), |b, _| {
            b.iter(|| {
                flip = !flip;
                set_rows.set(if flip { reversed.clone() } else { forward.clone() });
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fan_out, bench_memo_chain, bench_list_reorder);
criterion_main!(benches);
