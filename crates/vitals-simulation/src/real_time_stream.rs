//! Real-time vital-sign streaming for live monitoring

use crate::signal_patterns::VitalPattern;
use crate::vitals_simulator::{SimulatorConfig, VitalsSimulator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval, Duration, Instant};
use tracing::{debug, info, warn};
use vitals_core::{Sample, VitalsError, VitalsResult};

/// Configuration for real-time streaming
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub simulator: SimulatorConfig,
    /// Simulated seconds produced per update
    pub chunk_duration: f64,
    /// Update rate in Hz (how often to send new data)
    pub update_rate: f64,
    /// Capacity of the outgoing sample channel
    pub buffer_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            simulator: SimulatorConfig::default(),
            chunk_duration: 0.1, // 100ms chunks
            update_rate: 10.0,   // 10 Hz updates
            buffer_size: 4096,
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> VitalsResult<()> {
        if !(self.chunk_duration.is_finite() && self.chunk_duration > 0.0) {
            return Err(VitalsError::Simulation {
                reason: format!("chunk duration {} must be positive", self.chunk_duration),
            });
        }
        if !(self.update_rate.is_finite() && self.update_rate > 0.0) {
            return Err(VitalsError::Simulation {
                reason: format!("update rate {} must be positive", self.update_rate),
            });
        }
        if self.buffer_size == 0 {
            return Err(VitalsError::Simulation {
                reason: "buffer size must be greater than 0".to_string(),
            });
        }
        self.simulator.validate()
    }
}

/// Commands for controlling the stream
#[derive(Debug, Clone)]
pub enum StreamCommand {
    Start,
    /// Stop and rewind simulation time
    Stop,
    Pause,
    Resume,
    UpdatePattern(VitalPattern),
}

/// Stream statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamStats {
    pub is_running: bool,
    pub chunks_generated: u64,
    pub samples_sent: u64,
    /// Simulated time covered so far in seconds
    pub simulated_seconds: f64,
    pub last_chunk_us: u64,
}

/// Real-time vital-sign sample stream
pub struct RealTimeSampleStream {
    config: StreamConfig,
    simulator: VitalsSimulator,
    data_sender: mpsc::Sender<Sample>,
    control_receiver: mpsc::Receiver<StreamCommand>,
    control_sender: mpsc::Sender<StreamCommand>,
    stats: Arc<Mutex<StreamStats>>,
}

impl RealTimeSampleStream {
    /// Create new stream and the receiving end of its sample channel
    pub fn new(config: StreamConfig) -> VitalsResult<(Self, mpsc::Receiver<Sample>)> {
        config.validate()?;
        let simulator = VitalsSimulator::new(config.simulator.clone())?;
        let (data_sender, data_receiver) = mpsc::channel(config.buffer_size);
        let (control_sender, control_receiver) = mpsc::channel(32);

        let stream = RealTimeSampleStream {
            config,
            simulator,
            data_sender,
            control_receiver,
            control_sender,
            stats: Arc::new(Mutex::new(StreamStats::default())),
        };
        Ok((stream, data_receiver))
    }

    /// Get control sender for sending commands
    pub fn control_handle(&self) -> mpsc::Sender<StreamCommand> {
        self.control_sender.clone()
    }

    /// Shared statistics handle
    pub fn stats_handle(&self) -> Arc<Mutex<StreamStats>> {
        Arc::clone(&self.stats)
    }

    /// Run until the control channel closes or the sample receiver is dropped
    pub async fn run(mut self) -> VitalsResult<()> {
        let update_interval = Duration::from_secs_f64(1.0 / self.config.update_rate);
        let mut interval_timer = interval(update_interval);
        let mut is_running = false;

        info!(
            update_rate = self.config.update_rate,
            chunk_ms = self.config.chunk_duration * 1000.0,
            "Sample stream ready"
        );

        loop {
            tokio::select! {
                _ = interval_timer.tick(), if is_running => {
                    let start_time = Instant::now();
                    let chunk = self.simulator.generate(self.config.chunk_duration)?;
                    let generation_time = start_time.elapsed();

                    let count = chunk.len() as u64;
                    for sample in chunk {
                        if self.data_sender.send(sample).await.is_err() {
                            info!("Sample receiver dropped, stopping stream");
                            return Ok(());
                        }
                    }

                    {
                        let mut stats = self.stats.lock().await;
                        stats.chunks_generated += 1;
                        stats.samples_sent += count;
                        stats.simulated_seconds = self.simulator.elapsed();
                        stats.last_chunk_us = generation_time.as_micros() as u64;
                    }

                    if generation_time.as_secs_f64() > self.config.chunk_duration {
                        warn!(
                            generation_ms = generation_time.as_secs_f64() * 1000.0,
                            chunk_ms = self.config.chunk_duration * 1000.0,
                            "Chunk generation slower than real time"
                        );
                    }
                }

                command = self.control_receiver.recv() => {
                    match command {
                        Some(StreamCommand::Start) | Some(StreamCommand::Resume) => {
                            is_running = true;
                            self.stats.lock().await.is_running = true;
                            info!("Sample stream running");
                        }
                        Some(StreamCommand::Stop) => {
                            is_running = false;
                            self.simulator.reset_time();
                            *self.stats.lock().await = StreamStats::default();
                            info!("Sample stream stopped");
                        }
                        Some(StreamCommand::Pause) => {
                            is_running = false;
                            self.stats.lock().await.is_running = false;
                            info!("Sample stream paused");
                        }
                        Some(StreamCommand::UpdatePattern(pattern)) => {
                            self.simulator.set_pattern(pattern);
                            debug!(pattern = pattern.description(), "Sample stream pattern updated");
                        }
                        None => {
                            info!("Sample stream control channel closed");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Helper function to create and start a stream in the background
pub fn start_sample_stream(
    config: StreamConfig,
) -> VitalsResult<(mpsc::Receiver<Sample>, mpsc::Sender<StreamCommand>)> {
    let (stream, data_receiver) = RealTimeSampleStream::new(config)?;
    let control_sender = stream.control_handle();

    tokio::spawn(async move {
        if let Err(e) = stream.run().await {
            warn!(error = %e, "Sample stream error");
        }
    });

    Ok((data_receiver, control_sender))
}
