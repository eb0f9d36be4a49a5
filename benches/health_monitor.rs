//! 统计聚合与调度计算基准测试

use chrono::Utc;
use criterion::{criterion_group, criterion_main, Criterion};
use ping_watchdog::health::timing::{compute_random_interval_ms, JITTER_MAX_MINUTES, JITTER_MIN_MINUTES};
use ping_watchdog::health::{HealthMonitor, ProbeResult};
use std::hint::black_box;
use std::time::Duration;

/// 统计聚合基准测试
fn monitor_record_benchmark(c: &mut Criterion) {
    let ok = ProbeResult::response(200, Duration::from_millis(40));
    let down = ProbeResult::response(503, Duration::from_millis(40));
    let timed_out = ProbeResult::failure("Request timeout after 30000ms", Duration::from_secs(30));

    c.bench_function("monitor_record_mixed", |b| {
        let mut monitor = HealthMonitor::new(Utc::now());
        b.iter(|| {
            monitor.record(black_box(&ok));
            monitor.record(black_box(&down));
            monitor.record(black_box(&timed_out));
        });
    });

    c.bench_function("monitor_snapshot", |b| {
        let mut monitor = HealthMonitor::new(Utc::now());
        monitor.record(&timed_out);
        b.iter(|| black_box(monitor.snapshot()));
    });
}

/// 抖动间隔计算基准测试
fn jitter_benchmark(c: &mut Criterion) {
    c.bench_function("compute_random_interval_ms", |b| {
        b.iter(|| {
            compute_random_interval_ms(
                black_box(JITTER_MIN_MINUTES),
                black_box(JITTER_MAX_MINUTES),
                &rand::random::<f64>,
            )
        });
    });
}

criterion_group!(benches, monitor_record_benchmark, jitter_benchmark);
criterion_main!(benches);
