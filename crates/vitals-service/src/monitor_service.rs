//! Monitor service: async driver around a stream processor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vitals_core::{Sample, VitalsError, VitalsResult};
use vitals_processing::{ProcessingConfig, SessionId, SessionState, Snapshot, SnapshotConsumer, StreamProcessor};

/// Commands for controlling monitoring
#[derive(Debug, Clone)]
pub enum MonitorCommand {
    Start,
    Pause,
    Resume,
    /// Close the current session and start a fresh one
    Reset,
    /// Close the session and stop the service
    Close,
}

/// Statistics about the monitoring session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStats {
    pub is_running: bool,
    pub session_id: SessionId,
    pub state: SessionState,
    pub samples_received: u64,
    pub samples_rejected: u64,
    /// Samples discarded while paused
    pub samples_dropped: u64,
    pub snapshots_published: u64,
    pub active_alerts: usize,
    pub average_recompute_us: f64,
    pub last_update: Option<DateTime<Utc>>,
}

impl MonitorStats {
    fn new(session_id: SessionId) -> Self {
        Self {
            is_running: false,
            session_id,
            state: SessionState::Idle,
            samples_received: 0,
            samples_rejected: 0,
            samples_dropped: 0,
            snapshots_published: 0,
            active_alerts: 0,
            average_recompute_us: 0.0,
            last_update: None,
        }
    }
}

/// Fans snapshots out to the broadcast and latest-value channels
struct ChannelPublisher {
    snapshots: broadcast::Sender<Arc<Snapshot>>,
    latest: Arc<watch::Sender<Option<Arc<Snapshot>>>>,
}

impl SnapshotConsumer for ChannelPublisher {
    fn name(&self) -> &str {
        "channel-publisher"
    }

    fn on_snapshot(&mut self, snapshot: &Arc<Snapshot>) -> bool {
        // No subscribers is not an error
        let _ = self.snapshots.send(Arc::clone(snapshot));
        self.latest.send_replace(Some(Arc::clone(snapshot)));
        true
    }
}

/// Real-time vital-sign monitoring service
pub struct MonitorService {
    config: ProcessingConfig,
    processor: StreamProcessor,

    // Communication channels
    sample_receiver: mpsc::Receiver<Sample>,
    command_receiver: mpsc::Receiver<MonitorCommand>,
    command_sender: mpsc::Sender<MonitorCommand>,
    snapshot_sender: broadcast::Sender<Arc<Snapshot>>,
    latest: Arc<watch::Sender<Option<Arc<Snapshot>>>>,

    // State management
    is_running: bool,
    stats: Arc<Mutex<MonitorStats>>,
}

impl MonitorService {
    /// Create new monitor service and the sending end of its sample channel
    pub fn new(config: ProcessingConfig, sample_capacity: usize) -> VitalsResult<(Self, mpsc::Sender<Sample>)> {
        if sample_capacity == 0 {
            return Err(VitalsError::InvalidConfig {
                reason: "sample channel capacity must be greater than 0".to_string(),
            });
        }

        let (sample_sender, sample_receiver) = mpsc::channel(sample_capacity);
        let (command_sender, command_receiver) = mpsc::channel(32);
        let (snapshot_sender, _) = broadcast::channel(256);
        let (latest, _) = watch::channel(None);
        let latest = Arc::new(latest);

        let processor = Self::create_processor(&config, &snapshot_sender, &latest)?;
        let stats = MonitorStats::new(processor.session_id());

        let service = MonitorService {
            config,
            processor,
            sample_receiver,
            command_receiver,
            command_sender,
            snapshot_sender,
            latest,
            is_running: false,
            stats: Arc::new(Mutex::new(stats)),
        };
        Ok((service, sample_sender))
    }

    fn create_processor(
        config: &ProcessingConfig,
        snapshots: &broadcast::Sender<Arc<Snapshot>>,
        latest: &Arc<watch::Sender<Option<Arc<Snapshot>>>>,
    ) -> VitalsResult<StreamProcessor> {
        let mut processor = StreamProcessor::new(config.clone())?;
        processor.register_consumer(Box::new(ChannelPublisher {
            snapshots: snapshots.clone(),
            latest: Arc::clone(latest),
        }));
        Ok(processor)
    }

    /// Get a receiver for every published snapshot
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Snapshot>> {
        self.snapshot_sender.subscribe()
    }

    /// Get a receiver that always holds the latest snapshot
    pub fn latest(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.latest.subscribe()
    }

    /// Get command sender for controlling monitoring
    pub fn command_handle(&self) -> mpsc::Sender<MonitorCommand> {
        self.command_sender.clone()
    }

    pub fn stats_handle(&self) -> Arc<Mutex<MonitorStats>> {
        Arc::clone(&self.stats)
    }

    /// Main monitoring loop; commands take priority over queued samples
    pub async fn run(mut self) -> VitalsResult<()> {
        info!(
            session = %self.processor.session_id(),
            profile = %self.config.name,
            "Monitor service started"
        );

        loop {
            tokio::select! {
                biased;

                command = self.command_receiver.recv() => {
                    match command {
                        Some(MonitorCommand::Start) | Some(MonitorCommand::Resume) => {
                            self.is_running = true;
                            self.stats.lock().await.is_running = true;
                            info!("Monitoring running");
                        }
                        Some(MonitorCommand::Pause) => {
                            self.is_running = false;
                            self.stats.lock().await.is_running = false;
                            info!("Monitoring paused");
                        }
                        Some(MonitorCommand::Reset) => {
                            self.reset_session().await?;
                        }
                        Some(MonitorCommand::Close) | None => {
                            self.close_session().await;
                            break;
                        }
                    }
                }

                sample = self.sample_receiver.recv() => {
                    match sample {
                        Some(sample) => self.handle_sample(sample).await,
                        None => {
                            info!("Sample channel closed, stopping monitor service");
                            self.close_session().await;
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    async fn handle_sample(&mut self, sample: Sample) {
        if !self.is_running {
            debug!(timestamp = sample.timestamp(), "Sample dropped while paused");
            self.stats.lock().await.samples_dropped += 1;
            return;
        }

        let result = self.processor.push(sample);
        let mut stats = self.stats.lock().await;
        stats.samples_received += 1;

        match result {
            Ok(snapshot) => {
                stats.state = snapshot.state;
                stats.snapshots_published += 1;
                stats.active_alerts = snapshot.alert_segments().len();
                stats.average_recompute_us = self.processor.metrics().average_recompute_us();
                stats.last_update = Some(Utc::now());
            }
            Err(e) => {
                // Invalid samples are skipped; the session keeps running
                stats.samples_rejected += 1;
                warn!(error = %e, "Sample skipped");
            }
        }
    }

    async fn reset_session(&mut self) -> VitalsResult<()> {
        let old = self.processor.session_id();
        if let Err(e) = self.processor.close() {
            debug!(error = %e, "Session already closed before reset");
        }

        self.processor = Self::create_processor(&self.config, &self.snapshot_sender, &self.latest)?;

        let mut stats = self.stats.lock().await;
        *stats = MonitorStats::new(self.processor.session_id());
        stats.is_running = self.is_running;

        info!(old_session = %old, new_session = %self.processor.session_id(), "Session reset");
        Ok(())
    }

    async fn close_session(&mut self) {
        self.is_running = false;
        if let Err(e) = self.processor.close() {
            debug!(error = %e, "Session already closed");
        }

        let mut stats = self.stats.lock().await;
        stats.is_running = false;
        stats.state = self.processor.state();
        stats.last_update = Some(Utc::now());

        info!(
            session = %self.processor.session_id(),
            received = stats.samples_received,
            rejected = stats.samples_rejected,
            "Monitor service closed"
        );
    }

    /// Get current configuration
    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }
}

/// Handles to a monitor service running in the background
pub struct MonitorHandle {
    pub samples: mpsc::Sender<Sample>,
    pub commands: mpsc::Sender<MonitorCommand>,
    pub snapshots: broadcast::Receiver<Arc<Snapshot>>,
    pub latest: watch::Receiver<Option<Arc<Snapshot>>>,
    pub stats: Arc<Mutex<MonitorStats>>,
    pub task: JoinHandle<VitalsResult<()>>,
}

/// Helper function to start the monitor service in background
pub fn start_monitor_service(config: ProcessingConfig, sample_capacity: usize) -> VitalsResult<MonitorHandle> {
    let (service, samples) = MonitorService::new(config, sample_capacity)?;

    let snapshots = service.subscribe();
    let latest = service.latest();
    let commands = service.command_handle();
    let stats = service.stats_handle();

    // Start service in background task
    let task = tokio::spawn(async move {
        let result = service.run().await;
        if let Err(e) = &result {
            warn!(error = %e, "Monitor service error");
        }
        result
    });

    Ok(MonitorHandle {
        samples,
        commands,
        snapshots,
        latest,
        stats,
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, timeout, Duration};
    use vitals_core::ChannelId;

    fn spo2(t: f64, value: f64) -> Sample {
        Sample::new(t).with(ChannelId::Spo2, value)
    }

    async fn wait_for_generation(latest: &mut watch::Receiver<Option<Arc<Snapshot>>>, generation: u64) -> Arc<Snapshot> {
        timeout(Duration::from_secs(2), async {
            loop {
                if let Some(snapshot) = latest.borrow_and_update().clone() {
                    if snapshot.generation >= generation {
                        return snapshot;
                    }
                }
                latest.changed().await.unwrap();
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_monitor_publishes_snapshots() {
        let mut handle = start_monitor_service(ProcessingConfig::replay_review(), 64).unwrap();
        handle.commands.send(MonitorCommand::Start).await.unwrap();

        for i in 0..30 {
            let value = if (22..26).contains(&i) { 85.0 } else { 97.0 };
            handle.samples.send(spo2(i as f64, value)).await.unwrap();
        }

        let snapshot = wait_for_generation(&mut handle.latest, 30).await;
        assert_eq!(snapshot.state, SessionState::Active);
        assert_eq!(snapshot.alert_segments().len(), 1);
        assert_eq!(snapshot.alert_segments()[0].start_time, 22.0);

        let first = handle.snapshots.recv().await.unwrap();
        assert_eq!(first.generation, 1);

        handle.commands.send(MonitorCommand::Close).await.unwrap();
        timeout(Duration::from_secs(2), handle.task).await.unwrap().unwrap().unwrap();

        let stats = handle.stats.lock().await.clone();
        assert_eq!(stats.samples_received, 30);
        assert_eq!(stats.snapshots_published, 30);
        assert_eq!(stats.state, SessionState::Closed);
        assert!(!stats.is_running);

        let closed = handle.latest.borrow().clone().unwrap();
        assert_eq!(closed.state, SessionState::Closed);
    }

    #[tokio::test]
    async fn test_invalid_samples_are_skipped() {
        let mut handle = start_monitor_service(ProcessingConfig::replay_review(), 16).unwrap();
        handle.commands.send(MonitorCommand::Start).await.unwrap();

        handle.samples.send(spo2(0.0, 97.0)).await.unwrap();
        handle.samples.send(spo2(1.0, f64::NAN)).await.unwrap();
        handle.samples.send(spo2(0.0, 97.0)).await.unwrap();
        handle.samples.send(spo2(2.0, 96.0)).await.unwrap();

        let snapshot = wait_for_generation(&mut handle.latest, 2).await;
        assert_eq!(snapshot.timestamp, 2.0);

        let stats = handle.stats.lock().await.clone();
        assert_eq!(stats.samples_received, 4);
        assert_eq!(stats.samples_rejected, 2);
    }

    #[tokio::test]
    async fn test_paused_service_drops_samples() {
        let handle = start_monitor_service(ProcessingConfig::replay_review(), 16).unwrap();
        handle.commands.send(MonitorCommand::Start).await.unwrap();
        handle.commands.send(MonitorCommand::Pause).await.unwrap();

        for i in 0..5 {
            handle.samples.send(spo2(i as f64, 97.0)).await.unwrap();
        }
        sleep(Duration::from_millis(100)).await;

        let stats = handle.stats.lock().await.clone();
        assert_eq!(stats.samples_dropped, 5);
        assert_eq!(stats.samples_received, 0);
        assert!(!stats.is_running);
    }

    #[tokio::test]
    async fn test_reset_starts_new_session() {
        let mut handle = start_monitor_service(ProcessingConfig::replay_review(), 16).unwrap();
        handle.commands.send(MonitorCommand::Start).await.unwrap();

        for i in 0..3 {
            handle.samples.send(spo2(i as f64, 97.0)).await.unwrap();
        }
        let before = wait_for_generation(&mut handle.latest, 3).await;

        handle.commands.send(MonitorCommand::Reset).await.unwrap();
        // Timestamps may restart in the new session
        handle.samples.send(spo2(0.0, 97.0)).await.unwrap();

        let after = timeout(Duration::from_secs(2), async {
            loop {
                handle.latest.changed().await.unwrap();
                let current = handle.latest.borrow_and_update().clone().unwrap();
                if current.session_id != before.session_id {
                    return current;
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(after.generation, 1);
        assert_eq!(after.state, SessionState::Warming);
        assert_eq!(handle.stats.lock().await.session_id, after.session_id);
    }

    #[tokio::test]
    async fn test_sample_channel_close_stops_service() {
        let handle = start_monitor_service(ProcessingConfig::replay_review(), 4).unwrap();
        let MonitorHandle { samples, task, stats, .. } = handle;
        drop(samples);

        timeout(Duration::from_secs(2), task).await.unwrap().unwrap().unwrap();
        assert_eq!(stats.lock().await.state, SessionState::Closed);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(MonitorService::new(ProcessingConfig::default(), 0).is_err());
    }
}
