//! Vitals Monitor - simulator → monitor service → log output
//!
//! Usage: `vitals-monitor [config.json] [seconds]`

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use vitals_processing::{LogRecord, ProcessingConfig};
use vitals_service::{start_monitor_service, MonitorCommand};
use vitals_simulation::{start_sample_stream, SimulatorConfig, StreamCommand, StreamConfig, VitalPattern};

const DEFAULT_RUN_SECONDS: u64 = 60;

fn load_config(path: Option<&str>) -> Result<ProcessingConfig> {
    let config = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path).with_context(|| format!("reading config file {}", path))?;
            ProcessingConfig::from_json(&json)?
        }
        None => ProcessingConfig::bedside_monitor(),
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    let config = load_config(args.get(1).map(String::as_str))?;
    let run_seconds = match args.get(2) {
        Some(s) => s.parse().with_context(|| format!("invalid run duration '{}'", s))?,
        None => DEFAULT_RUN_SECONDS,
    };

    info!(profile = %config.name, run_seconds, "Starting vitals monitor");

    let mut monitor = start_monitor_service(config, 4096)?;

    let stream_config = StreamConfig {
        simulator: SimulatorConfig {
            pattern: VitalPattern::Desaturation {
                onset_s: 20.0,
                duration_s: 20.0,
                nadir_percent: 86.0,
            },
            ..SimulatorConfig::default()
        },
        ..StreamConfig::default()
    };
    let (mut samples, stream_control) = start_sample_stream(stream_config)?;

    // Forward simulated samples into the monitor
    let sample_sender = monitor.samples.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(sample) = samples.recv().await {
            if sample_sender.send(sample).await.is_err() {
                break;
            }
        }
    });

    monitor.commands.send(MonitorCommand::Start).await?;
    stream_control.send(StreamCommand::Start).await?;

    info!(columns = %LogRecord::HEADER.join(","), "Log record layout");

    let deadline = tokio::time::sleep(Duration::from_secs(run_seconds));
    tokio::pin!(deadline);
    let mut last_logged_second = -1.0;

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            snapshot = monitor.snapshots.recv() => {
                match snapshot {
                    Ok(snapshot) => {
                        // One log line per simulated second
                        let second = snapshot.timestamp.floor();
                        if second > last_logged_second {
                            last_logged_second = second;
                            let record = snapshot.log_record();
                            info!(
                                time = record.time,
                                state = %snapshot.state,
                                heart_rate = ?record.heart_rate,
                                ppg_filtered = ?record.ppg_filtered,
                                eeg_filtered = ?record.eeg_filtered,
                                alerts = snapshot.alert_segments().len(),
                                "Snapshot"
                            );
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "Snapshot reader lagged"),
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    stream_control.send(StreamCommand::Stop).await?;
    monitor.commands.send(MonitorCommand::Close).await?;
    forwarder.abort();
    monitor.task.await??;

    let stats = monitor.stats.lock().await.clone();
    info!(
        received = stats.samples_received,
        rejected = stats.samples_rejected,
        avg_recompute_us = stats.average_recompute_us,
        "Vitals monitor finished"
    );

    Ok(())
}
