//! Monitored channel identifiers

use core::fmt;
use serde::{Deserialize, Serialize};

/// Physiological channels carried by a [`Sample`](crate::Sample)
///
/// The set is closed: the processing cascade, the classifier rules and the
/// log record layout are all keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChannelId {
    /// Photoplethysmography raw amplitude
    Ppg,
    /// EEG-derived index (BIS) or raw EEG amplitude
    Eeg,
    /// Heart rate summary in bpm
    HeartRate,
    /// Peripheral oxygen saturation in %
    Spo2,
}

impl ChannelId {
    /// All channels in canonical order
    pub const ALL: [ChannelId; 4] = [
        ChannelId::Ppg,
        ChannelId::Eeg,
        ChannelId::HeartRate,
        ChannelId::Spo2,
    ];

    /// Short label used in logs and column headers
    pub fn label(&self) -> &'static str {
        match self {
            ChannelId::Ppg => "PPG",
            ChannelId::Eeg => "EEG",
            ChannelId::HeartRate => "HeartRate",
            ChannelId::Spo2 => "SpO2",
        }
    }

    /// Measurement unit
    pub fn unit(&self) -> &'static str {
        match self {
            ChannelId::Ppg => "a.u.",
            ChannelId::Eeg => "index",
            ChannelId::HeartRate => "bpm",
            ChannelId::Spo2 => "%",
        }
    }

    /// Whether the channel is a waveform (as opposed to a pre-computed summary)
    pub fn is_waveform(&self) -> bool {
        matches!(self, ChannelId::Ppg | ChannelId::Eeg)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
