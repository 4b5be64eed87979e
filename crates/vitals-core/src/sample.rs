//! Sample: one timestamped multi-channel measurement

use crate::channel::ChannelId;
use crate::error::VitalsResult;
use crate::invalid_sample;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamped multi-channel measurement
///
/// Immutable once built; samples may carry any subset of [`ChannelId`]s
/// (a P-file replay row has no EEG, a BIS row has only EEG).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    timestamp: f64,
    channels: BTreeMap<ChannelId, f64>,
}

impl Sample {
    /// Create a sample with no channel values
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            channels: BTreeMap::new(),
        }
    }

    /// Builder-style channel setter
    pub fn with(mut self, channel: ChannelId, value: f64) -> Self {
        self.channels.insert(channel, value);
        self
    }

    /// Build a sample from `(channel, value)` pairs
    pub fn from_values<I>(timestamp: f64, values: I) -> Self
    where
        I: IntoIterator<Item = (ChannelId, f64)>,
    {
        Self {
            timestamp,
            channels: values.into_iter().collect(),
        }
    }

    /// Timestamp in seconds
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Value of one channel, if present
    pub fn value(&self, channel: ChannelId) -> Option<f64> {
        self.channels.get(&channel).copied()
    }

    /// Whether the sample carries the channel
    pub fn has(&self, channel: ChannelId) -> bool {
        self.channels.contains_key(&channel)
    }

    /// Iterate present channels in canonical order
    pub fn channels(&self) -> impl Iterator<Item = (ChannelId, f64)> + '_ {
        self.channels.iter().map(|(c, v)| (*c, *v))
    }

    /// Number of channels present
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Check semantic constraints against the previously accepted timestamp
    ///
    /// Rejects non-finite or negative timestamps, timestamps that do not
    /// strictly advance, samples with no channels and non-finite values.
    pub fn validate_after(&self, previous: Option<f64>) -> VitalsResult<()> {
        if !self.timestamp.is_finite() {
            return Err(invalid_sample!("timestamp {} is not finite", self.timestamp));
        }
        if self.timestamp < 0.0 {
            return Err(invalid_sample!("timestamp {} is negative", self.timestamp));
        }
        if let Some(prev) = previous {
            if self.timestamp <= prev {
                return Err(invalid_sample!(
                    "timestamp {} does not advance past {}",
                    self.timestamp,
                    prev
                ));
            }
        }
        if self.channels.is_empty() {
            return Err(invalid_sample!("sample at {} carries no channels", self.timestamp));
        }
        for (channel, value) in &self.channels {
            if !value.is_finite() {
                return Err(invalid_sample!(
                    "{} value {} at {} is not finite",
                    channel,
                    value,
                    self.timestamp
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VitalsError;

    #[test]
    fn test_sample_builder() {
        let sample = Sample::new(1.25)
            .with(ChannelId::Ppg, 512.0)
            .with(ChannelId::Spo2, 97.0);

        assert_eq!(sample.timestamp(), 1.25);
        assert_eq!(sample.value(ChannelId::Ppg), Some(512.0));
        assert_eq!(sample.value(ChannelId::Eeg), None);
        assert!(sample.has(ChannelId::Spo2));
        assert_eq!(sample.channel_count(), 2);

        let order: Vec<ChannelId> = sample.channels().map(|(c, _)| c).collect();
        assert_eq!(order, vec![ChannelId::Ppg, ChannelId::Spo2]);
    }

    #[test]
    fn test_validation_accepts_advancing_timestamps() {
        let sample = Sample::new(2.0).with(ChannelId::HeartRate, 72.0);
        assert!(sample.validate_after(None).is_ok());
        assert!(sample.validate_after(Some(1.99)).is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_samples() {
        let nan_value = Sample::new(1.0).with(ChannelId::Ppg, f64::NAN);
        assert!(matches!(
            nan_value.validate_after(None),
            Err(VitalsError::InvalidSample { .. })
        ));

        let negative = Sample::new(-0.5).with(ChannelId::Ppg, 1.0);
        assert!(negative.validate_after(None).is_err());

        let nan_time = Sample::new(f64::NAN).with(ChannelId::Ppg, 1.0);
        assert!(nan_time.validate_after(None).is_err());

        let repeated = Sample::new(3.0).with(ChannelId::Ppg, 1.0);
        assert!(repeated.validate_after(Some(3.0)).is_err());
        assert!(repeated.validate_after(Some(4.0)).is_err());

        let empty = Sample::new(1.0);
        assert!(empty.validate_after(None).is_err());
    }

    #[test]
    fn test_serde_roundtrip_shape() {
        let sample = Sample::from_values(0.5, [(ChannelId::Eeg, 45.0)]);
        let json = serde_json::to_string(&sample).unwrap();
        assert!(json.contains("Eeg"));
        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }
}
