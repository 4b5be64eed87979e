//! Per-channel threshold classification

use serde::{Deserialize, Serialize};
use vitals_core::{ChannelId, VitalsError, VitalsResult};

/// Clinical alarm thresholds
///
/// A value is abnormal when it falls strictly outside its band; PPG has no
/// thresholds and is never flagged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub heart_rate_low: f64,
    pub heart_rate_high: f64,
    pub spo2_low: f64,
    pub eeg_low: f64,
    pub eeg_high: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            heart_rate_low: 50.0,
            heart_rate_high: 120.0,
            spo2_low: 90.0,
            eeg_low: 20.0,
            eeg_high: 80.0,
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) -> VitalsResult<()> {
        let all = [
            self.heart_rate_low,
            self.heart_rate_high,
            self.spo2_low,
            self.eeg_low,
            self.eeg_high,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(VitalsError::InvalidConfig {
                reason: "thresholds must be finite".to_string(),
            });
        }
        if self.heart_rate_low >= self.heart_rate_high {
            return Err(VitalsError::InvalidConfig {
                reason: format!(
                    "heart rate low threshold {} must be below high threshold {}",
                    self.heart_rate_low, self.heart_rate_high
                ),
            });
        }
        if self.eeg_low >= self.eeg_high {
            return Err(VitalsError::InvalidConfig {
                reason: format!(
                    "EEG low threshold {} must be below high threshold {}",
                    self.eeg_low, self.eeg_high
                ),
            });
        }
        Ok(())
    }
}

/// Which series of a channel the classifier sees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClassifierSource {
    #[default]
    Raw,
    Filtered,
}

/// Stateless threshold classifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AbnormalityClassifier {
    thresholds: ThresholdConfig,
}

impl AbnormalityClassifier {
    pub fn new(thresholds: ThresholdConfig) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    pub fn classify(&self, channel: ChannelId, value: f64) -> bool {
        let t = &self.thresholds;
        match channel {
            ChannelId::HeartRate => value < t.heart_rate_low || value > t.heart_rate_high,
            ChannelId::Spo2 => value < t.spo2_low,
            ChannelId::Eeg => value < t.eeg_low || value > t.eeg_high,
            ChannelId::Ppg => false,
        }
    }

    pub fn classify_series(&self, channel: ChannelId, values: &[f64]) -> Vec<bool> {
        values.iter().map(|&v| self.classify(channel, v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spo2_threshold() {
        let classifier = AbnormalityClassifier::default();
        assert!(classifier.classify(ChannelId::Spo2, 85.0));
        assert!(!classifier.classify(ChannelId::Spo2, 95.0));
        assert!(!classifier.classify(ChannelId::Spo2, 90.0));
    }

    #[test]
    fn test_heart_rate_band_is_exclusive() {
        let classifier = AbnormalityClassifier::default();
        assert!(classifier.classify(ChannelId::HeartRate, 49.9));
        assert!(!classifier.classify(ChannelId::HeartRate, 50.0));
        assert!(!classifier.classify(ChannelId::HeartRate, 120.0));
        assert!(classifier.classify(ChannelId::HeartRate, 121.0));
    }

    #[test]
    fn test_eeg_band() {
        let classifier = AbnormalityClassifier::default();
        assert_eq!(
            classifier.classify_series(ChannelId::Eeg, &[10.0, 20.0, 50.0, 80.0, 95.0]),
            vec![true, false, false, false, true]
        );
    }

    #[test]
    fn test_ppg_never_abnormal() {
        let classifier = AbnormalityClassifier::default();
        for v in [-1e6, 0.0, 512.0, 1e6] {
            assert!(!classifier.classify(ChannelId::Ppg, v));
        }
    }

    #[test]
    fn test_custom_thresholds() {
        let classifier = AbnormalityClassifier::new(ThresholdConfig {
            spo2_low: 94.0,
            ..ThresholdConfig::default()
        });
        assert!(classifier.classify(ChannelId::Spo2, 93.0));
    }

    #[test]
    fn test_threshold_validation() {
        assert!(ThresholdConfig::default().validate().is_ok());

        let inverted = ThresholdConfig {
            eeg_low: 90.0,
            ..ThresholdConfig::default()
        };
        assert!(inverted.validate().is_err());

        let nan = ThresholdConfig {
            spo2_low: f64::NAN,
            ..ThresholdConfig::default()
        };
        assert!(nan.validate().is_err());
    }
}
