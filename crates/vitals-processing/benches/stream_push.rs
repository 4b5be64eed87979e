//! Per-sample recompute cost of the streaming processor
//!
//! Every push refilters the whole window, so cost grows with window size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vitals_processing::{ProcessingConfig, StreamProcessor, WindowConfig, MIN_HISTORY};
use vitals_simulation::{SimulatorConfig, VitalsSimulator};

fn prefilled(capacity: usize, sim: &mut VitalsSimulator) -> StreamProcessor {
    let config = ProcessingConfig {
        window: WindowConfig {
            capacity,
            min_history: MIN_HISTORY,
        },
        ..ProcessingConfig::bedside_monitor()
    };
    let mut processor = StreamProcessor::new(config).unwrap();
    while processor.window_len() < capacity {
        processor.push(sim.next_sample()).unwrap();
    }
    processor
}

/// Benchmark push on a full window of mixed PPG, EEG and summary samples
fn bench_push_full_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_push");

    for &capacity in &[500usize, 3000] {
        let mut sim = VitalsSimulator::new(SimulatorConfig {
            seed: Some(42),
            ..SimulatorConfig::default()
        })
        .unwrap();
        let mut processor = prefilled(capacity, &mut sim);

        group.bench_with_input(BenchmarkId::new("bedside", capacity), &capacity, |b, _| {
            b.iter(|| {
                let snapshot = processor.push(black_box(sim.next_sample())).unwrap();
                black_box(snapshot)
            });
        });
    }

    group.finish();
}

/// Summary-only replay of a ten-minute recording
fn bench_replay_summary(c: &mut Criterion) {
    let samples = VitalsSimulator::new(SimulatorConfig {
        seed: Some(42),
        ..SimulatorConfig::summary_only()
    })
    .unwrap()
    .generate(600.0)
    .unwrap();

    c.bench_function("replay_summary_600s", |b| {
        b.iter(|| {
            let outcome =
                vitals_processing::replay(ProcessingConfig::replay_review(), black_box(samples.clone())).unwrap();
            black_box(outcome)
        });
    });
}

criterion_group!(benches, bench_push_full_window, bench_replay_summary);
criterion_main!(benches);
