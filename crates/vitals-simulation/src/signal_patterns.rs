//! Pre-defined clinical episode patterns for vital-sign simulation

use serde::{Deserialize, Serialize};

/// Target values the simulator tracks at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalTargets {
    pub heart_rate_bpm: f64,
    pub spo2_percent: f64,
    /// EEG-derived sedation index (0 = isoelectric, 100 = awake)
    pub bis_index: f64,
}

impl Default for VitalTargets {
    fn default() -> Self {
        Self {
            heart_rate_bpm: 72.0,
            spo2_percent: 97.0,
            bis_index: 50.0,
        }
    }
}

/// Predefined vital-sign patterns
///
/// Episodes start at `onset_s`, ramp in and out over [`RAMP_SECONDS`] (or
/// a quarter of the episode if shorter) and hold their extreme in between.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VitalPattern {
    /// Healthy sedated patient at baseline targets
    Stable,
    /// SpO2 falls to `nadir_percent`
    Desaturation {
        onset_s: f64,
        duration_s: f64,
        nadir_percent: f64,
    },
    /// Heart rate climbs to `peak_bpm`
    Tachycardia {
        onset_s: f64,
        duration_s: f64,
        peak_bpm: f64,
    },
    /// Heart rate drops to `low_bpm`
    Bradycardia {
        onset_s: f64,
        duration_s: f64,
        low_bpm: f64,
    },
    /// Sedation index falls to `bis_index`
    DeepSedation {
        onset_s: f64,
        duration_s: f64,
        bis_index: f64,
    },
}

/// Ramp time into and out of an episode
pub const RAMP_SECONDS: f64 = 5.0;

/// Episode weight in `[0, 1]` at `time`
fn episode_weight(time: f64, onset_s: f64, duration_s: f64) -> f64 {
    let end = onset_s + duration_s;
    if duration_s <= 0.0 || time < onset_s || time > end {
        return 0.0;
    }
    let ramp = RAMP_SECONDS.min(duration_s / 4.0);
    if ramp <= 0.0 {
        return 1.0;
    }
    let rising = (time - onset_s) / ramp;
    let falling = (end - time) / ramp;
    rising.min(falling).min(1.0)
}

fn blend(base: f64, extreme: f64, weight: f64) -> f64 {
    base + (extreme - base) * weight
}

impl VitalPattern {
    /// Target values at the given simulation time
    pub fn targets_at(&self, time: f64) -> VitalTargets {
        let base = VitalTargets::default();
        match *self {
            VitalPattern::Stable => base,

            VitalPattern::Desaturation { onset_s, duration_s, nadir_percent } => VitalTargets {
                spo2_percent: blend(base.spo2_percent, nadir_percent, episode_weight(time, onset_s, duration_s)),
                ..base
            },

            VitalPattern::Tachycardia { onset_s, duration_s, peak_bpm } => VitalTargets {
                heart_rate_bpm: blend(base.heart_rate_bpm, peak_bpm, episode_weight(time, onset_s, duration_s)),
                ..base
            },

            VitalPattern::Bradycardia { onset_s, duration_s, low_bpm } => VitalTargets {
                heart_rate_bpm: blend(base.heart_rate_bpm, low_bpm, episode_weight(time, onset_s, duration_s)),
                ..base
            },

            VitalPattern::DeepSedation { onset_s, duration_s, bis_index } => VitalTargets {
                bis_index: blend(base.bis_index, bis_index, episode_weight(time, onset_s, duration_s)),
                ..base
            },
        }
    }

    /// Get pattern description
    pub fn description(&self) -> &'static str {
        match self {
            VitalPattern::Stable => "Stable baseline",
            VitalPattern::Desaturation { .. } => "Oxygen desaturation",
            VitalPattern::Tachycardia { .. } => "Tachycardia episode",
            VitalPattern::Bradycardia { .. } => "Bradycardia episode",
            VitalPattern::DeepSedation { .. } => "Deep sedation",
        }
    }

    /// Create common preset patterns
    pub fn presets() -> Vec<(&'static str, VitalPattern)> {
        vec![
            ("Stable", VitalPattern::Stable),
            ("Mild Desaturation", VitalPattern::Desaturation {
                onset_s: 20.0, duration_s: 30.0, nadir_percent: 88.0
            }),
            ("Severe Desaturation", VitalPattern::Desaturation {
                onset_s: 10.0, duration_s: 60.0, nadir_percent: 80.0
            }),
            ("Tachycardia", VitalPattern::Tachycardia {
                onset_s: 15.0, duration_s: 40.0, peak_bpm: 140.0
            }),
            ("Bradycardia", VitalPattern::Bradycardia {
                onset_s: 15.0, duration_s: 40.0, low_bpm: 42.0
            }),
            ("Deep Sedation", VitalPattern::DeepSedation {
                onset_s: 10.0, duration_s: 60.0, bis_index: 12.0
            }),
        ]
    }
}
