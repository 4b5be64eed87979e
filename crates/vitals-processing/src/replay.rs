//! Batch replay of recorded samples through the live processing path

use crate::config::ProcessingConfig;
use crate::peaks::HeartRateEstimate;
use crate::snapshot::{SessionId, Snapshot};
use crate::stream::StreamProcessor;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use vitals_core::{AlertSegment, ChannelId, Sample, VitalsResult};

/// Result of replaying a recording
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub session_id: SessionId,
    /// Segments of the final window, indexed into that window
    pub alert_segments: Vec<AlertSegment>,
    /// Every abnormal run seen during the replay, indexed into the recording
    pub recording_segments: Vec<AlertSegment>,
    pub heart_rate: HeartRateEstimate,
    pub accepted: u64,
    pub rejected: u64,
    pub final_snapshot: Option<Arc<Snapshot>>,
}

#[derive(Debug, Clone, Copy, Default)]
struct ChannelCursor {
    /// Samples of this channel accepted so far
    seen: usize,
    last_time: Option<f64>,
}

/// Accumulates alert segments over a whole session
///
/// A snapshot only reports runs inside its window. The recorder maps them
/// onto per-channel recording indices and merges runs that continue from
/// one cycle into the next, so episodes survive eviction.
#[derive(Debug, Clone, Default)]
pub struct SegmentRecorder {
    cursors: BTreeMap<ChannelId, ChannelCursor>,
    segments: BTreeMap<ChannelId, Vec<AlertSegment>>,
}

impl SegmentRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one snapshot into the recording
    ///
    /// Snapshots must be recorded in generation order without gaps.
    pub fn record(&mut self, snapshot: &Snapshot) {
        for (channel, view) in &snapshot.derived.channels {
            let cursor = self.cursors.entry(*channel).or_default();
            let fresh = match cursor.last_time {
                Some(last) => view.times.iter().rev().take_while(|t| **t > last).count(),
                None => view.times.len(),
            };
            cursor.seen += fresh;
            if let Some(t) = view.times.last() {
                cursor.last_time = Some(*t);
            }
            let offset = cursor.seen.saturating_sub(view.len());

            let runs = self.segments.entry(*channel).or_default();
            for segment in snapshot.derived.segments_for(*channel) {
                let global = AlertSegment::new(
                    *channel,
                    offset + segment.start_index,
                    offset + segment.end_index,
                    segment.start_time,
                    segment.end_time,
                );
                merge_run(runs, global);
            }
        }
    }

    /// Recorded segments in channel order, then time order
    pub fn segments(&self) -> Vec<AlertSegment> {
        self.segments.values().flatten().copied().collect()
    }
}

fn merge_run(runs: &mut Vec<AlertSegment>, segment: AlertSegment) {
    match runs.last_mut() {
        // Overlapping or index-adjacent runs are one episode
        Some(last) if segment.start_index <= last.end_index + 1 => {
            if segment.start_index < last.start_index {
                last.start_index = segment.start_index;
                last.start_time = segment.start_time;
            }
            if segment.end_index > last.end_index {
                last.end_index = segment.end_index;
                last.end_time = segment.end_time;
            }
        }
        _ => runs.push(segment),
    }
}

/// Push every sample through a fresh session and close it
///
/// Invalid samples are counted and skipped; any other error aborts the
/// replay.
pub fn replay<I>(config: ProcessingConfig, samples: I) -> VitalsResult<ReplayOutcome>
where
    I: IntoIterator<Item = Sample>,
{
    let mut processor = StreamProcessor::new(config)?;
    let mut recorder = SegmentRecorder::new();

    for sample in samples {
        match processor.push(sample) {
            Ok(snapshot) => recorder.record(&snapshot),
            Err(e) if e.is_recoverable() => {}
            Err(e) => return Err(e),
        }
    }

    let final_snapshot = processor.close()?;
    let metrics = *processor.metrics();
    let recording_segments = recorder.segments();

    info!(
        session = %processor.session_id(),
        accepted = metrics.accepted,
        rejected = metrics.rejected,
        episodes = recording_segments.len(),
        "Replay finished"
    );

    let (alert_segments, heart_rate) = match &final_snapshot {
        Some(snapshot) => (snapshot.alert_segments().to_vec(), snapshot.heart_rate),
        None => (Vec::new(), HeartRateEstimate::invalid()),
    };

    Ok(ReplayOutcome {
        session_id: processor.session_id(),
        alert_segments,
        recording_segments,
        heart_rate,
        accepted: metrics.accepted,
        rejected: metrics.rejected,
        final_snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitals_core::ChannelId;

    #[test]
    fn test_replay_counts_rejections() {
        let samples = vec![
            Sample::new(0.0).with(ChannelId::Spo2, 97.0),
            Sample::new(1.0).with(ChannelId::Spo2, 85.0),
            Sample::new(0.5).with(ChannelId::Spo2, 85.0),
            Sample::new(2.0).with(ChannelId::Spo2, f64::INFINITY),
            Sample::new(3.0),
        ];
        let outcome = replay(ProcessingConfig::replay_review(), samples).unwrap();
        assert_eq!(outcome.accepted, 2);
        assert_eq!(outcome.rejected, 3);
        // Two samples never reach the minimum history
        assert!(outcome.alert_segments.is_empty());
        assert!(!outcome.heart_rate.valid);
    }

    #[test]
    fn test_empty_replay() {
        let outcome = replay(ProcessingConfig::replay_review(), Vec::new()).unwrap();
        assert!(outcome.final_snapshot.is_none());
        assert_eq!(outcome.accepted, 0);
    }

    #[test]
    fn test_replay_finds_episodes() {
        let samples = (0..60).map(|i| {
            let spo2 = if (20..30).contains(&i) { 86.0 } else { 97.0 };
            let hr = if i >= 50 { 130.0 } else { 72.0 };
            Sample::new(i as f64)
                .with(ChannelId::Spo2, spo2)
                .with(ChannelId::HeartRate, hr)
        });
        let outcome = replay(ProcessingConfig::replay_review(), samples).unwrap();

        assert_eq!(outcome.alert_segments.len(), 2);
        let hr = &outcome.alert_segments[0];
        assert_eq!(hr.channel, ChannelId::HeartRate);
        assert_eq!((hr.start_time, hr.end_time), (50.0, 59.0));
        let spo2 = &outcome.alert_segments[1];
        assert_eq!(spo2.channel, ChannelId::Spo2);
        assert_eq!((spo2.start_time, spo2.end_time), (20.0, 29.0));
    }

    fn spo2_rows(count: usize, low: std::ops::Range<usize>) -> impl Iterator<Item = Sample> {
        (0..count).map(move |i| {
            let value = if low.contains(&i) { 85.0 } else { 97.0 };
            Sample::new(i as f64).with(ChannelId::Spo2, value)
        })
    }

    #[test]
    fn test_episode_older_than_window_is_kept() {
        let outcome = replay(ProcessingConfig::replay_review(), spo2_rows(600, 20..30)).unwrap();

        // Long evicted from the 180-sample window
        assert!(outcome.alert_segments.is_empty());
        assert_eq!(
            outcome.recording_segments,
            vec![AlertSegment::new(ChannelId::Spo2, 20, 29, 20.0, 29.0)]
        );
    }

    #[test]
    fn test_episode_spanning_eviction_is_merged() {
        let outcome = replay(ProcessingConfig::replay_review(), spo2_rows(400, 100..251)).unwrap();

        assert_eq!(
            outcome.recording_segments,
            vec![AlertSegment::new(ChannelId::Spo2, 100, 250, 100.0, 250.0)]
        );
        // The final window only sees the tail of the run
        assert_eq!(outcome.alert_segments.len(), 1);
        assert_eq!(outcome.alert_segments[0].start_time, 220.0);
    }

    #[test]
    fn test_recorder_indexes_each_channel_separately() {
        let samples = (0..300).map(|i| {
            let t = i as f64;
            let sample = Sample::new(t).with(ChannelId::Spo2, if (10..15).contains(&i) { 85.0 } else { 97.0 });
            // Heart rate only on even seconds
            if i % 2 == 0 {
                sample.with(ChannelId::HeartRate, if (40..50).contains(&i) { 130.0 } else { 72.0 })
            } else {
                sample
            }
        });
        let outcome = replay(ProcessingConfig::replay_review(), samples).unwrap();

        assert_eq!(
            outcome.recording_segments,
            vec![
                AlertSegment::new(ChannelId::HeartRate, 20, 24, 40.0, 48.0),
                AlertSegment::new(ChannelId::Spo2, 10, 14, 10.0, 14.0),
            ]
        );
    }
}
