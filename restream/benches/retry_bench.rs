//! Benchmarks for retry link throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use restream::prelude::*;
use restream::testing::{CollectingConsumer, SequenceProducer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn passthrough_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("passthrough");
    for len in [16_usize, 256, 4096] {
        let items: Vec<u64> = (0..len as u64).collect();
        let operator = SequenceProducer::<u64, String>::new(items).retry_if(|_: &u64| false);
        group.bench_with_input(BenchmarkId::from_parameter(len), &operator, |b, operator| {
            b.iter(|| {
                let consumer = Arc::new(CollectingConsumer::<u64, String>::new());
                operator.attach(consumer.clone());
                black_box(consumer.items().len())
            });
        });
    }
    group.finish();
}

fn recovery_benchmark(c: &mut Criterion) {
    c.bench_function("retry_with_recovery", |b| {
        b.iter(|| {
            let fired = AtomicBool::new(false);
            let operator = SequenceProducer::<u64, String>::new((0..64).collect())
                .retry_if_but_first(SequenceProducer::new(vec![0; 8]), move |item: &u64| {
                    *item == 32 && !fired.swap(true, Ordering::Relaxed)
                });
            let consumer = Arc::new(
                CollectingConsumer::<u64, String>::with_demand(Demand::max(1))
                    .returning(Demand::max(1)),
            );
            operator.attach(consumer.clone());
            black_box(consumer.items().len())
        });
    });
}

criterion_group!(benches, passthrough_benchmark, recovery_benchmark);
criterion_main!(benches);
