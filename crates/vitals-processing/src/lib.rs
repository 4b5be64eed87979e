//! Vitals-Processing: Stream processing for bedside vital signs
//!
//! Sliding-window filtering, PPG heart-rate estimation, threshold
//! classification and alert segmentation, published as immutable snapshots.

pub mod classifier;
pub mod config;
mod design;
pub mod filters;
pub mod metrics;
pub mod peaks;
pub mod replay;
pub mod segmenter;
pub mod snapshot;
pub mod stream;
pub mod window;

pub use classifier::{AbnormalityClassifier, ClassifierSource, ThresholdConfig};
pub use config::{ChannelConfig, HeartRateConfig, ProcessingConfig, WindowConfig};
pub use filters::{apply, BiquadSection, DesignedFilter, FilterBank, FilterKind, FilterSpec, MIN_HISTORY};
pub use metrics::{ProcessingTimer, StreamMetrics};
pub use peaks::{HeartRateEstimate, HeartRateEstimator, PeakDetector, PeakSet};
pub use replay::{replay, ReplayOutcome, SegmentRecorder};
pub use segmenter::RunSegmenter;
pub use snapshot::{
    ChannelView, DerivedState, LogRecord, SessionId, SessionState, Snapshot, SnapshotConsumer,
};
pub use stream::StreamProcessor;
pub use window::{ChannelSeries, SlidingWindowBuffer};
