//! Performance benchmarks for the bubble tree.

use bubbletree::{Filter, Store, SubscribeOptions};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

fn deep_path(depth: usize) -> String {
    (0..depth).map(|i| format!("/n{}", i)).collect()
}

/// Benchmark bubbling cost with varying path depths
fn bench_bubble_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("bubble_depth");

    for depth in [1, 10, 50, 200] {
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, &depth| {
            let store = Store::default();
            let leaf = deep_path(depth);
            store.save(&leaf, "x", json!(0)).unwrap();

            // One bubbling listener per ancestor
            store
                .bubbler()
                .subscribe("/", SubscribeOptions::default(), |_| Ok(()))
                .unwrap();
            for d in 1..depth {
                store
                    .bubbler()
                    .subscribe(&deep_path(d), SubscribeOptions::default(), |_| Ok(()))
                    .unwrap();
            }

            b.iter(|| {
                store.emit(&leaf, "ping", vec![]).unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark dispatch with filtered listeners
fn bench_filtered_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtered_dispatch");

    for listeners in [10, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("listeners", listeners),
            &listeners,
            |b, &count| {
                let store = Store::default();
                store.save("/hub/item", "type", json!("item")).unwrap();

                for i in 0..count {
                    // Half of the listeners reject on type
                    let wanted = if i % 2 == 0 { "item" } else { "other" };
                    store
                        .bubbler()
                        .subscribe(
                            "/hub",
                            SubscribeOptions::default().with_filter(Filter::types([wanted])),
                            |_| Ok(()),
                        )
                        .unwrap();
                }

                b.iter(|| {
                    store.emit("/hub/item", "ping", vec![]).unwrap();
                });
            },
        );
    }

    group.finish();
}

/// Benchmark save into an existing node (update path)
fn bench_save_update(c: &mut Criterion) {
    let store = Store::default();
    store.save("/a/b/c", "x", json!(0)).unwrap();

    c.bench_function("save_update", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            store.save("/a/b/c", "x", json!(i)).unwrap();
        });
    });
}

/// Benchmark recursive reads of a wide node
fn bench_recursive_get(c: &mut Criterion) {
    let store = Store::default();
    for i in 0..1000 {
        store
            .save(&format!("/wide/{}", i), "index", json!(i))
            .unwrap();
    }

    c.bench_function("recursive_get_1000_children", |b| {
        b.iter(|| {
            black_box(store.get_node("/wide", true).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_bubble_depth,
    bench_filtered_dispatch,
    bench_save_update,
    bench_recursive_get,
);

criterion_main!(benches);
