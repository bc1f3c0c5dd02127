//! Performance benchmarks for the stream primitives.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flowbase::hooks::{self, Hook};
use flowbase::{
    add_cap, add_cap_atomic, Attr, AttrValue, ChannelConfig, ChannelSubscriber, Context,
    DeferredSubscription, Failure, MonoSubscriber, MultiSubscriptionSubscriber, ScalarSubscription,
    Scannable, Subscriber, Subscription,
};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Subscriber that only counts values.
#[derive(Default)]
struct Count(AtomicUsize);

impl Subscriber<u64> for Count {
    fn on_subscribe(&self, _subscription: Arc<dyn Subscription<u64>>) {}

    fn on_next(&self, _value: u64) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    fn on_error(&self, _error: Failure) {}

    fn on_complete(&self) {}
}

/// Upstream that ignores everything.
struct Idle;

impl Scannable for Idle {
    fn scan(&self, _attr: Attr) -> Option<AttrValue> {
        None
    }
}

impl Subscription<u64> for Idle {
    fn request(&self, _n: i64) {}

    fn cancel(&self) {}
}

/// Benchmark saturating demand arithmetic
fn bench_demand(c: &mut Criterion) {
    let mut group = c.benchmark_group("demand");

    group.bench_function("add_cap", |b| {
        b.iter(|| add_cap(black_box(1 << 40), black_box(1 << 41)))
    });

    group.bench_function("add_cap_atomic", |b| {
        let cell = AtomicI64::new(0);
        b.iter(|| {
            add_cap_atomic(&cell, black_box(1));
            if cell.load(Ordering::Relaxed) > 1 << 50 {
                cell.store(0, Ordering::Relaxed);
            }
        })
    });

    group.finish();
}

/// Benchmark single-value delivery paths
fn bench_single_value(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_value");
    let actual: Arc<dyn Subscriber<u64>> = Arc::new(Count::default());

    group.bench_function("scalar_request", |b| {
        b.iter(|| {
            let scalar = ScalarSubscription::new(actual.clone(), black_box(1));
            scalar.request(1);
        })
    });

    group.bench_function("mono_complete_then_request", |b| {
        b.iter(|| {
            let mono = MonoSubscriber::new(actual.clone());
            mono.complete(black_box(1));
            mono.request(1);
        })
    });

    group.bench_function("deferred_bind", |b| {
        let idle: Arc<dyn Subscription<u64>> = Arc::new(Idle);
        b.iter(|| {
            let deferred = DeferredSubscription::<u64>::new();
            deferred.request(black_box(16));
            deferred.set(idle.clone());
        })
    });

    group.finish();
}

/// Benchmark arbiter accounting with varying numbers of replacements
fn bench_arbiter(c: &mut Criterion) {
    let mut group = c.benchmark_group("arbiter");
    let actual: Arc<dyn Subscriber<u64>> = Arc::new(Count::default());

    for replacements in [1, 10, 100] {
        group.bench_with_input(
            BenchmarkId::new("replacements", replacements),
            &replacements,
            |b, &n| {
                b.iter(|| {
                    let arbiter = MultiSubscriptionSubscriber::new(actual.clone());
                    arbiter.request(1_000);
                    for i in 0..n {
                        arbiter.set(Arc::new(Idle));
                        arbiter.on_next(i as u64);
                    }
                    black_box(arbiter.requested())
                })
            },
        );
    }

    group.finish();
}

/// Benchmark hook resolution, local against process-wide
fn bench_hooks(c: &mut Criterion) {
    let mut group = c.benchmark_group("hooks");
    let _guard = hooks::scoped();

    let local = Context::empty().with_hook(Hook::operator_error(|e, _| e));
    group.bench_function("operator_error_local", |b| {
        b.iter(|| hooks::on_operator_error(Failure::msg("x"), None, &local))
    });

    hooks::install(Hook::operator_error(|e, _| e));
    group.bench_function("operator_error_global", |b| {
        b.iter(|| hooks::on_operator_error(Failure::msg("x"), None, &Context::empty()))
    });

    group.bench_function("rejected_execution", |b| {
        b.iter(|| hooks::on_rejected_execution(Failure::msg("x"), None, None, &Context::empty()))
    });

    group.finish();
}

/// Benchmark the channel bridge with varying prefetch
fn bench_channel(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel");

    for prefetch in [16, 256] {
        group.bench_with_input(BenchmarkId::new("prefetch", prefetch), &prefetch, |b, &p| {
            b.iter(|| {
                let (subscriber, mut signals) = ChannelSubscriber::<u64>::new(ChannelConfig {
                    prefetch: p,
                    ..Default::default()
                })
                .unwrap();
                subscriber.on_subscribe(Arc::new(Idle));
                for i in 0..p as u64 {
                    subscriber.on_next(i);
                }
                for _ in 0..p {
                    black_box(signals.recv().unwrap());
                }
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_demand,
    bench_single_value,
    bench_arbiter,
    bench_hooks,
    bench_channel,
);

criterion_main!(benches);
