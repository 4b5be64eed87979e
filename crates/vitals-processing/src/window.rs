//! Fixed-capacity sliding window of samples

use std::collections::VecDeque;
use vitals_core::{ChannelId, Sample, VitalsError, VitalsResult};

/// Insertion-ordered, count-bounded sample buffer
///
/// Oldest samples are evicted first once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct SlidingWindowBuffer {
    capacity: usize,
    samples: VecDeque<Sample>,
}

/// One channel's values extracted from the window, with their timestamps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSeries {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

impl ChannelSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SlidingWindowBuffer {
    pub fn new(capacity: usize) -> VitalsResult<Self> {
        if capacity == 0 {
            return Err(VitalsError::InvalidConfig {
                reason: "window capacity must be greater than 0".to_string(),
            });
        }
        Ok(Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        })
    }

    /// Append a sample, returning the evicted one if the window was full
    pub fn push(&mut self, sample: Sample) -> Option<Sample> {
        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.samples.back().map(Sample::timestamp)
    }

    /// Iterate samples oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.samples.iter()
    }

    /// Channels present in at least one buffered sample, canonical order
    pub fn present_channels(&self) -> Vec<ChannelId> {
        ChannelId::ALL
            .into_iter()
            .filter(|c| self.samples.iter().any(|s| s.has(*c)))
            .collect()
    }

    /// Extract one channel's series in arrival order
    ///
    /// Samples that do not carry the channel are skipped.
    pub fn channel_series(&self, channel: ChannelId) -> ChannelSeries {
        let mut series = ChannelSeries {
            times: Vec::with_capacity(self.samples.len()),
            values: Vec::with_capacity(self.samples.len()),
        };
        for sample in &self.samples {
            if let Some(value) = sample.value(channel) {
                series.times.push(sample.timestamp());
                series.values.push(value);
            }
        }
        series
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
