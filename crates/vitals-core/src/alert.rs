//! Alert segments: maximal runs of abnormal samples

use crate::channel::ChannelId;
use serde::{Deserialize, Serialize};

/// Contiguous run of abnormal samples on one channel
///
/// Indices refer to positions in the channel's series within the window the
/// segment was computed from; times are the timestamps at those positions.
/// A single-sample run has `start_time == end_time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertSegment {
    pub channel: ChannelId,
    pub start_time: f64,
    pub end_time: f64,
    pub start_index: usize,
    pub end_index: usize,
}

impl AlertSegment {
    pub fn new(channel: ChannelId, start_index: usize, end_index: usize, start_time: f64, end_time: f64) -> Self {
        Self {
            channel,
            start_time,
            end_time,
            start_index,
            end_index,
        }
    }

    /// Segment duration in seconds
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Number of samples in the run
    pub fn sample_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    /// Whether `time` falls inside the segment (inclusive)
    pub fn contains_time(&self, time: f64) -> bool {
        time >= self.start_time && time <= self.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_geometry() {
        let segment = AlertSegment {
            channel: ChannelId::Spo2,
            start_time: 10.0,
            end_time: 14.0,
            start_index: 3,
            end_index: 7,
        };
        assert_eq!(segment.duration(), 4.0);
        assert_eq!(segment.sample_count(), 5);
        assert!(segment.contains_time(14.0));
        assert!(!segment.contains_time(14.5));
    }
}
