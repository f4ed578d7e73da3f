//! Performance benchmarks for the transcript and trace normalization paths
//!
//! Every probe fragment passes through these functions on the worker thread,
//! so they should stay cheap relative to the probes themselves.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use net_diagnosis::{
    probes::{normalize_trace_line, trace::collapse_timeouts},
    transcript::{CollectingListener, LogAccumulator, ProgressChannel},
    types::TraceEngine,
};
use std::hint::black_box;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Sample traceroute output mixing hop lines, timeouts and headers
fn sample_trace_lines(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 4 {
            0 => format!("{:2}  10.0.{}.1  {}.{:03} ms  1.204 ms  0.998 ms", i + 1, i % 255, i % 40, i % 1000),
            1 => format!("{:2}  * * *", i + 1),
            2 => format!("{:2}  192.168.{}.254  12.5 ms *  13.1 ms", i + 1, i % 255),
            _ => "traceroute to a.example.com (93.184.216.34), 30 hops max, 60 byte packets".to_string(),
        })
        .collect()
}

fn bench_transcript_appends(c: &mut Criterion) {
    let mut group = c.benchmark_group("transcript_appends");

    for size in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("detached", size), &size, |b, &size| {
            b.iter(|| {
                let log = LogAccumulator::detached();
                for i in 0..size {
                    log.record_step(black_box(&format!("64 bytes from 10.0.0.1: icmp_seq={} ttl=56 time=10.4 ms", i)));
                }
                black_box(log.len())
            })
        });

        group.bench_with_input(BenchmarkId::new("with_listener", size), &size, |b, &size| {
            b.iter(|| {
                let listener = Arc::new(CollectingListener::new());
                let log = LogAccumulator::new(ProgressChannel::new(listener, CancellationToken::new()));
                for i in 0..size {
                    log.append(black_box(&format!(" {}  10.0.0.1  0.512 ms\n", i)));
                }
                black_box(log.finish())
            })
        });
    }

    group.finish();
}

fn bench_trace_normalization(c: &mut Criterion) {
    let lines = sample_trace_lines(64);

    c.bench_function("collapse_timeouts", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(collapse_timeouts(black_box(line)));
            }
        })
    });

    let mut group = c.benchmark_group("normalize_trace_line");
    for engine in [TraceEngine::Native, TraceEngine::Ping] {
        group.bench_with_input(BenchmarkId::from_parameter(engine), &engine, |b, &engine| {
            b.iter(|| {
                for line in &lines {
                    black_box(normalize_trace_line(engine, black_box(line)));
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_transcript_appends, bench_trace_normalization);
criterion_main!(benches);
