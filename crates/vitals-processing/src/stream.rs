//! Stream processor: window, filter cascade, heart rate, alerts
//!
//! A [`StreamProcessor`] owns one monitoring session. Each accepted sample
//! triggers a full recompute over the window and publishes a new
//! [`Snapshot`]; nothing is carried incrementally between cycles.

use crate::classifier::{AbnormalityClassifier, ClassifierSource};
use crate::config::ProcessingConfig;
use crate::filters::FilterBank;
use crate::metrics::StreamMetrics;
use crate::peaks::{HeartRateEstimate, PeakSet};
use crate::segmenter::RunSegmenter;
use crate::snapshot::{ChannelView, DerivedState, SessionId, SessionState, Snapshot, SnapshotConsumer};
use crate::window::SlidingWindowBuffer;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use vitals_core::{Sample, VitalsError, VitalsResult};

pub struct StreamProcessor {
    session_id: SessionId,
    config: ProcessingConfig,
    window: SlidingWindowBuffer,
    filters: FilterBank,
    classifier: AbnormalityClassifier,
    segmenter: RunSegmenter,
    state: SessionState,
    generation: u64,
    last_timestamp: Option<f64>,
    latest: Option<Arc<Snapshot>>,
    consumers: Vec<Box<dyn SnapshotConsumer>>,
    metrics: StreamMetrics,
}

impl StreamProcessor {
    /// Create a session; configuration errors are fatal here
    pub fn new(config: ProcessingConfig) -> VitalsResult<Self> {
        config.validate()?;
        let filters = config.build_filter_bank()?;
        let window = SlidingWindowBuffer::new(config.window.capacity)?;
        let session_id = SessionId::new();

        info!(
            session = %session_id,
            profile = %config.name,
            capacity = config.window.capacity,
            "Stream processor created"
        );

        Ok(Self {
            session_id,
            classifier: AbnormalityClassifier::new(config.thresholds),
            segmenter: RunSegmenter::new(),
            config,
            window,
            filters,
            state: SessionState::Idle,
            generation: 0,
            last_timestamp: None,
            latest: None,
            consumers: Vec::new(),
            metrics: StreamMetrics::new(),
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn metrics(&self) -> &StreamMetrics {
        &self.metrics
    }

    pub fn latest_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.latest.clone()
    }

    pub fn register_consumer(&mut self, consumer: Box<dyn SnapshotConsumer>) {
        debug!(session = %self.session_id, consumer = consumer.name(), "Consumer registered");
        self.consumers.push(consumer);
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Ingest one sample and publish the resulting snapshot
    ///
    /// Rejected samples return `InvalidSample` and leave every piece of
    /// session state untouched.
    pub fn push(&mut self, sample: Sample) -> VitalsResult<Arc<Snapshot>> {
        if self.state == SessionState::Closed {
            return Err(VitalsError::SessionClosed);
        }

        if let Err(e) = sample.validate_after(self.last_timestamp) {
            self.metrics.rejected += 1;
            warn!(session = %self.session_id, error = %e, "Sample rejected");
            return Err(e);
        }

        let timestamp = sample.timestamp();
        self.window.push(sample);
        self.last_timestamp = Some(timestamp);
        self.metrics.accepted += 1;

        if self.state == SessionState::Idle {
            self.transition(SessionState::Warming);
        }
        if self.state == SessionState::Warming && self.window.len() >= self.config.window.min_history {
            self.transition(SessionState::Active);
        }

        let timer = StreamMetrics::start_timing();
        let derived = self.derive()?;
        let elapsed_us = timer.finish();
        self.metrics.record_recompute(elapsed_us);

        self.generation += 1;
        let snapshot = Arc::new(self.build_snapshot(timestamp, Arc::new(derived)));

        debug!(
            session = %self.session_id,
            generation = self.generation,
            window = self.window.len(),
            segments = snapshot.alert_segments().len(),
            elapsed_us,
            "Recompute cycle complete"
        );

        self.publish(&snapshot);
        self.latest = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Close the session, flushing a final snapshot to consumers
    ///
    /// Returns `None` when no sample was ever accepted.
    pub fn close(&mut self) -> VitalsResult<Option<Arc<Snapshot>>> {
        if self.state == SessionState::Closed {
            return Err(VitalsError::SessionClosed);
        }

        self.transition(SessionState::Closed);

        let final_snapshot = self.latest.as_ref().map(|latest| {
            self.generation += 1;
            Arc::new(Snapshot {
                generation: self.generation,
                state: SessionState::Closed,
                ..Snapshot::clone(latest)
            })
        });

        if let Some(snapshot) = &final_snapshot {
            self.publish(snapshot);
        }
        for consumer in &mut self.consumers {
            consumer.on_close(self.session_id);
        }
        self.consumers.clear();
        self.window.clear();
        self.latest = final_snapshot.clone();

        info!(
            session = %self.session_id,
            accepted = self.metrics.accepted,
            rejected = self.metrics.rejected,
            avg_recompute_us = self.metrics.average_recompute_us(),
            "Session closed"
        );

        Ok(final_snapshot)
    }

    fn transition(&mut self, next: SessionState) {
        info!(session = %self.session_id, from = %self.state, to = %next, "Session state change");
        self.state = next;
    }

    /// Recompute every derived view from the current window
    pub(crate) fn derive(&self) -> VitalsResult<DerivedState> {
        let active = self.state == SessionState::Active;
        let mut derived = DerivedState::default();

        for channel in self.window.present_channels() {
            let series = self.window.channel_series(channel);

            let (filtered, flags) = if active {
                let filtered = self.filters.apply(channel, &series.values);
                let classified = match self.config.classifier_source(channel) {
                    ClassifierSource::Raw => &series.values,
                    ClassifierSource::Filtered => &filtered,
                };
                let flags = self.classifier.classify_series(channel, classified);
                (filtered, flags)
            } else {
                (series.values.clone(), Vec::new())
            };

            if active {
                let segments = self.segmenter.segment(channel, &flags, &series.times)?;
                derived.alert_segments.extend(segments);
            }

            derived.channels.insert(
                channel,
                ChannelView {
                    times: series.times,
                    raw: series.values,
                    filtered,
                    flags,
                },
            );
        }

        let (peaks, heart_rate) = if active {
            self.estimate_heart_rate(&derived)
        } else {
            (PeakSet::default(), HeartRateEstimate::invalid())
        };
        derived.peaks = peaks;
        derived.heart_rate = heart_rate;

        Ok(derived)
    }

    fn estimate_heart_rate(&self, derived: &DerivedState) -> (PeakSet, HeartRateEstimate) {
        let hr_config = &self.config.heart_rate;
        let (Some(view), Some(rate)) = (
            derived.channel(hr_config.source),
            self.config.sampling_rate(hr_config.source),
        ) else {
            return (PeakSet::default(), HeartRateEstimate::invalid());
        };

        let peaks = hr_config.detector.detect(&view.filtered, rate);
        let heart_rate = hr_config.estimator.estimate(peaks.indices(), rate);
        (peaks, heart_rate)
    }

    fn build_snapshot(&self, timestamp: f64, derived: Arc<DerivedState>) -> Snapshot {
        let mut raw_values = BTreeMap::new();
        let mut filtered_values = BTreeMap::new();
        for (channel, view) in &derived.channels {
            if let Some(v) = view.latest_raw() {
                raw_values.insert(*channel, v);
            }
            if let Some(v) = view.latest_filtered() {
                filtered_values.insert(*channel, v);
            }
        }

        Snapshot {
            session_id: self.session_id,
            generation: self.generation,
            timestamp,
            state: self.state,
            raw_values,
            filtered_values,
            heart_rate: derived.heart_rate,
            derived,
        }
    }

    fn publish(&mut self, snapshot: &Arc<Snapshot>) {
        let session_id = self.session_id;
        self.consumers.retain_mut(|consumer| {
            let attached = consumer.on_snapshot(snapshot);
            if !attached {
                warn!(session = %session_id, consumer = consumer.name(), "Consumer detached");
            }
            attached
        });
    }
}
