use chrono::{DateTime, TimeDelta, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use notidock::{
    ContainerEvent, EntityKey, EventFilter, NotificationThrottler, Reclaimer, ReclaimerConfig,
    ShardedStorage, ThrottlePolicy,
};
use std::sync::Arc;

fn base_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_717_243_200, 0).unwrap_or_default()
}

/// Benchmark single-threaded decision throughput
fn bench_single_threaded_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_threaded");
    group.throughput(Throughput::Elements(1000));

    for (name, policy) in [
        ("disabled", ThrottlePolicy::disabled()),
        ("threshold_20", ThrottlePolicy::default()),
        ("threshold_1000", ThrottlePolicy::default().with_threshold(1000)),
    ] {
        group.bench_function(name, |b| {
            let throttler = NotificationThrottler::with_policy(policy);
            let key = EntityKey::new("web", "nginx:1.27");
            let now = base_time();

            b.iter(|| {
                for _ in 0..1000 {
                    black_box(throttler.decide(black_box(&key), now));
                }
            })
        });
    }

    group.finish();
}

/// Benchmark a stream sliding through many buckets
fn bench_sliding_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("sliding_window");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("one_event_per_second", |b| {
        let throttler = NotificationThrottler::with_policy(
            ThrottlePolicy::default()
                .with_window(TimeDelta::seconds(300))
                .with_threshold(i64::MAX),
        );
        let key = EntityKey::new("web", "nginx:1.27");
        let start = base_time();

        b.iter(|| {
            for i in 0..1000 {
                let now = start + TimeDelta::seconds(i);
                black_box(throttler.decide(&key, now));
            }
            throttler.registry().clear();
        })
    });

    group.finish();
}

/// Benchmark multi-threaded concurrent throughput for both backends
fn bench_concurrent_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");

    for num_threads in [2, 4, 8] {
        group.throughput(Throughput::Elements((num_threads as u64) * 1000));

        group.bench_with_input(
            BenchmarkId::new("single_lock", num_threads),
            &num_threads,
            |b, &num_threads| {
                b.iter(|| {
                    let throttler = NotificationThrottler::builder().with_threshold(100).build();
                    run_threads(num_threads, move |name| {
                        throttler.should_notify(name, "img", base_time())
                    });
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("sharded", num_threads),
            &num_threads,
            |b, &num_threads| {
                b.iter(|| {
                    let throttler = NotificationThrottler::builder()
                        .with_threshold(100)
                        .build_with_storage(Arc::new(ShardedStorage::new()));
                    run_threads(num_threads, move |name| {
                        throttler.should_notify(name, "img", base_time())
                    });
                })
            },
        );
    }

    group.finish();
}

fn run_threads<F>(num_threads: usize, decide: F)
where
    F: Fn(&str) -> bool + Clone + Send + 'static,
{
    let handles: Vec<_> = (0..num_threads)
        .map(|i| {
            let decide = decide.clone();
            std::thread::spawn(move || {
                // Each thread uses its own container to measure lock contention only
                let name = format!("container-{i}");
                for _ in 0..1000 {
                    black_box(decide(black_box(&name)));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

/// Benchmark reclaim sweeps over registries of different sizes
fn bench_reclaim_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("reclaim_sweep");

    for num_entities in [100, 1000, 10_000] {
        group.bench_with_input(
            BenchmarkId::new("all_stale", num_entities),
            &num_entities,
            |b, &num_entities| {
                b.iter(|| {
                    let throttler = NotificationThrottler::builder().build();
                    for i in 0..num_entities {
                        throttler.should_notify(&format!("c{i}"), "img", base_time());
                    }
                    let reclaimer = Reclaimer::new(&throttler, ReclaimerConfig::default());
                    black_box(reclaimer.sweep(base_time() + TimeDelta::hours(1)))
                })
            },
        );
    }

    group.finish();
}

/// Benchmark label filtering
fn bench_filter(c: &mut Criterion) {
    let filter = EventFilter::new(true, vec!["start".into(), "die".into()], vec![]);
    let mut event = ContainerEvent {
        kind: "container".into(),
        action: "die".into(),
        ..Default::default()
    };
    for (k, v) in [
        ("name", "web"),
        ("image", "nginx:1.27"),
        ("exitCode", "1"),
        ("notidock.events", "start,die,kill"),
    ] {
        event.actor.attributes.insert(k.into(), v.into());
    }

    c.bench_function("filter_evaluate", |b| {
        b.iter(|| black_box(filter.evaluate(black_box(&event))))
    });
}

criterion_group!(
    benches,
    bench_single_threaded_throughput,
    bench_sliding_window,
    bench_concurrent_throughput,
    bench_reclaim_sweep,
    bench_filter,
);
criterion_main!(benches);
