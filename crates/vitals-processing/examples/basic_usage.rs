//! Basic usage of the vitals processing cascade
//!
//! Replays a simulated summary recording, then streams a short multi-rate
//! capture through a live processor and prints what it derived.

use std::sync::mpsc;
use std::sync::Arc;
use vitals_core::{ChannelId, VitalsResult};
use vitals_processing::{replay, ProcessingConfig, Snapshot, StreamProcessor};
use vitals_simulation::{SimulatorConfig, VitalPattern, VitalsSimulator};

fn main() -> VitalsResult<()> {
    println!("=== Vitals Processing Basic Usage ===\n");

    replay_example()?;
    live_example()?;

    println!("=== Done ===");
    Ok(())
}

/// Example 1: offline review of a 1 Hz summary recording
fn replay_example() -> VitalsResult<()> {
    println!("1. Replay of a summary recording");

    let pattern = VitalPattern::Desaturation {
        onset_s: 60.0,
        duration_s: 45.0,
        nadir_percent: 84.0,
    };
    let samples = VitalsSimulator::new(SimulatorConfig {
        pattern,
        seed: Some(1),
        ..SimulatorConfig::summary_only()
    })?
    .generate(170.0)?;

    let outcome = replay(ProcessingConfig::replay_review(), samples)?;
    println!("   Pattern: {}", pattern.description());
    println!("   Accepted {} samples, rejected {}", outcome.accepted, outcome.rejected);
    for segment in &outcome.recording_segments {
        println!(
            "   {} abnormal from {:.0}s to {:.0}s ({} samples)",
            segment.channel,
            segment.start_time,
            segment.end_time,
            segment.end_index - segment.start_index + 1
        );
    }
    println!();
    Ok(())
}

/// Example 2: live processing with a snapshot consumer
fn live_example() -> VitalsResult<()> {
    println!("2. Live processing of PPG, EEG and summaries");

    let mut processor = StreamProcessor::new(ProcessingConfig::bedside_monitor())?;
    let (tx, rx) = mpsc::channel::<Arc<Snapshot>>();
    processor.register_consumer(Box::new(tx));

    let mut sim = VitalsSimulator::new(SimulatorConfig {
        ppg_baseline: 0.0,
        seed: Some(2),
        ..SimulatorConfig::default()
    })?;
    for sample in sim.generate(8.0)? {
        processor.push(sample)?;
    }
    processor.close()?;

    let snapshots: Vec<_> = rx.try_iter().collect();
    println!("   Received {} snapshots", snapshots.len());

    if let Some(last) = snapshots.iter().rev().find(|s| s.heart_rate.valid) {
        println!("   Heart rate from PPG: {:.1} bpm", last.heart_rate.value_bpm);
        if let Some(eeg) = last.derived.channel(ChannelId::Eeg) {
            println!("   EEG window: {} samples", eeg.len());
        }
        let record = last.log_record();
        println!("   {}", vitals_processing::LogRecord::HEADER.join(","));
        let row: Vec<String> = record
            .values()
            .iter()
            .map(|v| v.map(|x| format!("{:.2}", x)).unwrap_or_default())
            .collect();
        println!("   {}", row.join(","));
    }
    println!();
    Ok(())
}
