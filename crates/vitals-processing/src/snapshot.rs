//! Immutable per-cycle snapshots and their consumers
//!
//! Every accepted push publishes one [`Snapshot`]. Snapshots are shared as
//! `Arc<Snapshot>` and never mutated; the derived caches of a cycle are
//! replaced together behind a single `Arc<DerivedState>`.

use crate::peaks::{HeartRateEstimate, PeakSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;
use vitals_core::{AlertSegment, ChannelId};

/// Unique identifier of a processing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No sample accepted yet
    Idle,
    /// Buffer below minimum history; values pass through unprocessed
    Warming,
    Active,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Idle => "idle",
            SessionState::Warming => "warming",
            SessionState::Active => "active",
            SessionState::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// One channel's view of the window
///
/// `times`, `raw` and `filtered` always have equal length. `flags` has the
/// same length once the session is active and is empty while warming.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelView {
    pub times: Vec<f64>,
    pub raw: Vec<f64>,
    pub filtered: Vec<f64>,
    pub flags: Vec<bool>,
}

impl ChannelView {
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn latest_raw(&self) -> Option<f64> {
        self.raw.last().copied()
    }

    pub fn latest_filtered(&self) -> Option<f64> {
        self.filtered.last().copied()
    }
}

/// Everything derived from one window in one recompute cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedState {
    pub channels: BTreeMap<ChannelId, ChannelView>,
    /// Peaks on the heart-rate source channel's filtered view
    pub peaks: PeakSet,
    pub heart_rate: HeartRateEstimate,
    /// Alert segments of all channels, channel order then time order
    pub alert_segments: Vec<AlertSegment>,
}

impl DerivedState {
    pub fn channel(&self, channel: ChannelId) -> Option<&ChannelView> {
        self.channels.get(&channel)
    }

    pub fn segments_for(&self, channel: ChannelId) -> impl Iterator<Item = &AlertSegment> + '_ {
        self.alert_segments.iter().filter(move |s| s.channel == channel)
    }
}

/// Immutable state published after each accepted sample
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub session_id: SessionId,
    /// Strictly increasing per session
    pub generation: u64,
    /// Timestamp of the newest sample in the window
    pub timestamp: f64,
    pub state: SessionState,
    /// Latest raw value per channel present in the window
    pub raw_values: BTreeMap<ChannelId, f64>,
    /// Latest filtered value per channel present in the window
    pub filtered_values: BTreeMap<ChannelId, f64>,
    pub heart_rate: HeartRateEstimate,
    pub derived: Arc<DerivedState>,
}

impl Snapshot {
    pub fn alert_segments(&self) -> &[AlertSegment] {
        &self.derived.alert_segments
    }

    /// Whether the newest value of `channel` is flagged abnormal
    pub fn is_abnormal(&self, channel: ChannelId) -> bool {
        self.derived
            .channel(channel)
            .and_then(|view| view.flags.last().copied())
            .unwrap_or(false)
    }

    /// Flat record for the data logger
    pub fn log_record(&self) -> LogRecord {
        LogRecord {
            time: self.timestamp,
            ppg_raw: self.raw_values.get(&ChannelId::Ppg).copied(),
            ppg_filtered: self.filtered_values.get(&ChannelId::Ppg).copied(),
            eeg_raw: self.raw_values.get(&ChannelId::Eeg).copied(),
            eeg_filtered: self.filtered_values.get(&ChannelId::Eeg).copied(),
            heart_rate: self.heart_rate.bpm(),
        }
    }
}

/// One row of the monitoring log
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub time: f64,
    pub ppg_raw: Option<f64>,
    pub ppg_filtered: Option<f64>,
    pub eeg_raw: Option<f64>,
    pub eeg_filtered: Option<f64>,
    pub heart_rate: Option<f64>,
}

impl LogRecord {
    /// Column names in record order
    pub const HEADER: [&'static str; 6] = [
        "Time",
        "PPG_Raw",
        "PPG_Filtered",
        "EEG_Raw",
        "EEG_Filtered",
        "HeartRate",
    ];

    /// Values in [`LogRecord::HEADER`] order
    pub fn values(&self) -> [Option<f64>; 6] {
        [
            Some(self.time),
            self.ppg_raw,
            self.ppg_filtered,
            self.eeg_raw,
            self.eeg_filtered,
            self.heart_rate,
        ]
    }
}

/// Receives snapshots from a stream processor
///
/// Consumers are read-only observers; they run on the pushing thread and
/// should hand work off rather than block.
pub trait SnapshotConsumer: Send {
    /// Consumer name for logging
    fn name(&self) -> &str;

    /// Deliver a snapshot; returning `false` detaches the consumer
    fn on_snapshot(&mut self, snapshot: &Arc<Snapshot>) -> bool;

    /// Called once when the session closes
    fn on_close(&mut self, _session_id: SessionId) {}
}

impl SnapshotConsumer for std::sync::mpsc::Sender<Arc<Snapshot>> {
    fn name(&self) -> &str {
        "mpsc-sender"
    }

    fn on_snapshot(&mut self, snapshot: &Arc<Snapshot>) -> bool {
        self.send(Arc::clone(snapshot)).is_ok()
    }
}
