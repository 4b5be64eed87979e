//! Configuration management for vital-sign stream processing

use crate::classifier::{ClassifierSource, ThresholdConfig};
use crate::filters::{FilterBank, FilterSpec, MIN_HISTORY};
use crate::peaks::{HeartRateEstimator, PeakDetector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vitals_core::{filter_config_error, ChannelId, VitalsError, VitalsResult};

/// Global processing configuration for one monitoring session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Configuration name/profile
    pub name: String,
    pub window: WindowConfig,
    /// Per-channel sampling rate, filter chain and classifier binding
    pub channels: BTreeMap<ChannelId, ChannelConfig>,
    pub thresholds: ThresholdConfig,
    pub heart_rate: HeartRateConfig,
}

/// Sliding window sizing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Maximum number of buffered samples
    pub capacity: usize,
    /// Samples required before the session goes active
    ///
    /// The comparison is inclusive: a window holding exactly `min_history`
    /// samples is active, not only one that exceeds it. Filters use the
    /// same count, passing shorter buffers through unchanged, so the first
    /// active cycle is also the first filtered one.
    pub min_history: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            capacity: 3000,
            min_history: MIN_HISTORY,
        }
    }
}

/// Processing parameters for a single channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub sampling_rate_hz: f64,
    /// Filters applied in order
    pub filters: Vec<FilterSpec>,
    #[serde(default)]
    pub classifier_source: ClassifierSource,
}

impl ChannelConfig {
    /// Unfiltered channel classified on raw values
    pub fn unfiltered(sampling_rate_hz: f64) -> Self {
        Self {
            sampling_rate_hz,
            filters: Vec::new(),
            classifier_source: ClassifierSource::Raw,
        }
    }

    pub fn with_filter(mut self, spec: FilterSpec) -> Self {
        self.filters.push(spec);
        self
    }
}

/// Where the heart rate is derived from and how
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateConfig {
    /// Waveform channel whose filtered view is searched for peaks
    pub source: ChannelId,
    pub detector: PeakDetector,
    pub estimator: HeartRateEstimator,
}

impl Default for HeartRateConfig {
    fn default() -> Self {
        Self {
            source: ChannelId::Ppg,
            detector: PeakDetector::default(),
            estimator: HeartRateEstimator::default(),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self::bedside_monitor()
    }
}

/// Preset configurations for common scenarios
impl ProcessingConfig {
    /// Live bedside monitoring: PPG at 100 Hz, EEG at 250 Hz with mains notch
    pub fn bedside_monitor() -> Self {
        let mut config = ProcessingConfig {
            name: "Bedside monitor".to_string(),
            window: WindowConfig::default(),
            channels: BTreeMap::new(),
            thresholds: ThresholdConfig::default(),
            heart_rate: HeartRateConfig::default(),
        };

        config.add_channel(
            ChannelId::Ppg,
            ChannelConfig::unfiltered(100.0).with_filter(FilterSpec::bandpass(0.5, 15.0, 4, 100.0)),
        );
        config.add_channel(
            ChannelId::Eeg,
            ChannelConfig::unfiltered(250.0)
                .with_filter(FilterSpec::bandpass(0.5, 50.0, 4, 250.0))
                .with_filter(FilterSpec::notch(50.0, 30.0, 250.0)),
        );
        config.add_channel(ChannelId::HeartRate, ChannelConfig::unfiltered(1.0));
        config.add_channel(ChannelId::Spo2, ChannelConfig::unfiltered(1.0));

        config
    }

    /// Review of 1 Hz summary recordings (heart rate, SpO2, BIS index)
    pub fn replay_review() -> Self {
        let mut config = ProcessingConfig {
            name: "Replay review".to_string(),
            window: WindowConfig {
                capacity: 180,
                min_history: MIN_HISTORY,
            },
            channels: BTreeMap::new(),
            thresholds: ThresholdConfig::default(),
            heart_rate: HeartRateConfig::default(),
        };

        config.add_channel(ChannelId::HeartRate, ChannelConfig::unfiltered(1.0));
        config.add_channel(ChannelId::Spo2, ChannelConfig::unfiltered(1.0));
        config.add_channel(ChannelId::Eeg, ChannelConfig::unfiltered(1.0));

        config
    }

    /// Insert or replace a channel section
    pub fn add_channel(&mut self, channel: ChannelId, channel_config: ChannelConfig) {
        self.channels.insert(channel, channel_config);
    }

    pub fn channel(&self, channel: ChannelId) -> Option<&ChannelConfig> {
        self.channels.get(&channel)
    }

    pub fn sampling_rate(&self, channel: ChannelId) -> Option<f64> {
        self.channels.get(&channel).map(|c| c.sampling_rate_hz)
    }

    /// Classifier binding for a channel; unconfigured channels use raw values
    pub fn classifier_source(&self, channel: ChannelId) -> ClassifierSource {
        self.channels
            .get(&channel)
            .map(|c| c.classifier_source)
            .unwrap_or_default()
    }

    pub fn set_classifier_source(&mut self, channel: ChannelId, source: ClassifierSource) -> VitalsResult<()> {
        match self.channels.get_mut(&channel) {
            Some(channel_config) => {
                channel_config.classifier_source = source;
                Ok(())
            }
            None => Err(VitalsError::InvalidConfig {
                reason: format!("Channel '{}' is not configured", channel),
            }),
        }
    }

    /// Validate entire configuration
    pub fn validate(&self) -> VitalsResult<()> {
        if self.name.trim().is_empty() {
            return Err(VitalsError::InvalidConfig {
                reason: "Configuration name must not be empty".to_string(),
            });
        }

        if self.window.capacity == 0 {
            return Err(VitalsError::InvalidConfig {
                reason: "Window capacity must be greater than 0".to_string(),
            });
        }

        if self.window.min_history == 0 || self.window.min_history > self.window.capacity {
            return Err(VitalsError::InvalidConfig {
                reason: format!(
                    "Minimum history {} must be between 1 and the window capacity {}",
                    self.window.min_history, self.window.capacity
                ),
            });
        }

        for (channel, channel_config) in &self.channels {
            self.validate_channel(*channel, channel_config)?;
        }

        self.thresholds.validate()?;
        self.validate_heart_rate()
    }

    /// Validate individual channel section
    fn validate_channel(&self, channel: ChannelId, channel_config: &ChannelConfig) -> VitalsResult<()> {
        let rate = channel_config.sampling_rate_hz;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(VitalsError::InvalidConfig {
                reason: format!("Channel '{}' sampling rate {} must be positive", channel, rate),
            });
        }

        if !channel.is_waveform() && !channel_config.filters.is_empty() {
            return Err(filter_config_error!("Channel '{}' is a summary channel and cannot be filtered", channel));
        }

        for spec in &channel_config.filters {
            spec.validate()?;
            if spec.sampling_rate_hz != rate {
                return Err(filter_config_error!(
                    "Channel '{}' runs at {} Hz but its filter is designed for {} Hz",
                    channel,
                    rate,
                    spec.sampling_rate_hz
                ));
            }
        }

        Ok(())
    }

    fn validate_heart_rate(&self) -> VitalsResult<()> {
        let hr = &self.heart_rate;
        if !hr.source.is_waveform() {
            return Err(VitalsError::InvalidConfig {
                reason: format!("Heart rate source '{}' is not a waveform channel", hr.source),
            });
        }

        let detector = &hr.detector;
        if !(detector.threshold_std_factor.is_finite() && detector.min_distance_s.is_finite() && detector.min_distance_s >= 0.0) {
            return Err(VitalsError::InvalidConfig {
                reason: "Peak detector factors must be finite and non-negative".to_string(),
            });
        }

        let estimator = &hr.estimator;
        if !(estimator.min_bpm.is_finite() && estimator.max_bpm.is_finite() && estimator.min_bpm < estimator.max_bpm) {
            return Err(VitalsError::InvalidConfig {
                reason: format!(
                    "Heart rate bounds ({}, {}) are not an increasing finite range",
                    estimator.min_bpm, estimator.max_bpm
                ),
            });
        }

        Ok(())
    }

    /// Design every configured filter into a bank
    pub fn build_filter_bank(&self) -> VitalsResult<FilterBank> {
        let mut bank = FilterBank::new(self.window.min_history);
        for (channel, channel_config) in &self.channels {
            for spec in &channel_config.filters {
                bank.add_filter(*channel, spec)?;
            }
        }
        Ok(bank)
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> VitalsResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| VitalsError::Serialization {
            reason: format!("Failed to serialize config: {}", e),
        })
    }

    /// Import configuration from JSON
    pub fn from_json(json: &str) -> VitalsResult<Self> {
        serde_json::from_str(json).map_err(|e| VitalsError::Serialization {
            reason: format!("Failed to deserialize config: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bedside_config() {
        let config = ProcessingConfig::bedside_monitor();
        assert_eq!(config.window.capacity, 3000);
        assert_eq!(config.window.min_history, 20);
        assert_eq!(config.sampling_rate(ChannelId::Ppg), Some(100.0));
        assert_eq!(config.sampling_rate(ChannelId::Eeg), Some(250.0));
        assert_eq!(config.channel(ChannelId::Eeg).unwrap().filters.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_replay_config() {
        let config = ProcessingConfig::replay_review();
        assert_eq!(config.window.capacity, 180);
        assert!(config.channel(ChannelId::Ppg).is_none());
        assert!(config.validate().is_ok());
        assert!(config.build_filter_bank().unwrap().chain(ChannelId::Eeg).is_empty());
    }

    #[test]
    fn test_default_is_bedside() {
        assert_eq!(ProcessingConfig::default(), ProcessingConfig::bedside_monitor());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ProcessingConfig::bedside_monitor();

        // Valid config should pass
        assert!(config.validate().is_ok());

        // Zero capacity should fail
        config.window.capacity = 0;
        assert!(config.validate().is_err());

        // Minimum history larger than the window can never activate
        config.window.capacity = 10;
        config.window.min_history = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_filter_errors_are_filter_configuration() {
        let mut config = ProcessingConfig::bedside_monitor();
        config.add_channel(
            ChannelId::Ppg,
            ChannelConfig::unfiltered(100.0).with_filter(FilterSpec::bandpass(0.5, 60.0, 4, 100.0)),
        );
        assert!(matches!(config.validate(), Err(VitalsError::FilterConfiguration { .. })));

        // Filter designed for a different rate than the channel
        let mut config = ProcessingConfig::bedside_monitor();
        config.add_channel(
            ChannelId::Ppg,
            ChannelConfig::unfiltered(100.0).with_filter(FilterSpec::bandpass(0.5, 15.0, 4, 250.0)),
        );
        assert!(matches!(config.validate(), Err(VitalsError::FilterConfiguration { .. })));

        // Summary channels carry no filters
        let mut config = ProcessingConfig::bedside_monitor();
        config.add_channel(
            ChannelId::Spo2,
            ChannelConfig::unfiltered(100.0).with_filter(FilterSpec::bandpass(0.5, 15.0, 4, 100.0)),
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_classifier_source_binding() {
        let mut config = ProcessingConfig::bedside_monitor();
        assert_eq!(config.classifier_source(ChannelId::Eeg), ClassifierSource::Raw);

        config.set_classifier_source(ChannelId::Eeg, ClassifierSource::Filtered).unwrap();
        assert_eq!(config.classifier_source(ChannelId::Eeg), ClassifierSource::Filtered);

        let mut replay = ProcessingConfig::replay_review();
        assert!(replay.set_classifier_source(ChannelId::Ppg, ClassifierSource::Filtered).is_err());
        assert_eq!(replay.classifier_source(ChannelId::Ppg), ClassifierSource::Raw);
    }

    #[test]
    fn test_heart_rate_source_must_be_waveform() {
        let mut config = ProcessingConfig::bedside_monitor();
        config.heart_rate.source = ChannelId::Spo2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_filter_bank_from_config() {
        let bank = ProcessingConfig::bedside_monitor().build_filter_bank().unwrap();
        assert_eq!(bank.chain(ChannelId::Ppg).len(), 1);
        assert_eq!(bank.chain(ChannelId::Eeg).len(), 2);
        assert!(bank.chain(ChannelId::Spo2).is_empty());
        assert_eq!(bank.min_history(), 20);
    }

    #[test]
    fn test_json_serialization() {
        let config = ProcessingConfig::bedside_monitor();

        let json = config.to_json().unwrap();
        assert!(json.contains("\"Ppg\""));

        let deserialized = ProcessingConfig::from_json(&json).unwrap();
        assert_eq!(config, deserialized);

        assert!(matches!(
            ProcessingConfig::from_json("{ not json"),
            Err(VitalsError::Serialization { .. })
        ));
    }
}
