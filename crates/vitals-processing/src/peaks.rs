//! Peak detection and heart-rate estimation on the filtered PPG waveform

use serde::{Deserialize, Serialize};
use vitals_core::ChannelStats;

/// Fewer samples than this yield no peaks
pub const MIN_PEAK_SAMPLES: usize = 10;

/// Indices of detected peaks, strictly increasing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakSet {
    indices: Vec<usize>,
    rate_hz: f64,
}

impl PeakSet {
    pub fn empty(rate_hz: f64) -> Self {
        Self {
            indices: Vec::new(),
            rate_hz,
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Sampling rate the detection ran at
    pub fn rate_hz(&self) -> f64 {
        self.rate_hz
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Adaptive-threshold local maximum detector
///
/// Threshold is `mean + threshold_std_factor * std` of the buffer handed to
/// each call; peaks closer than `ceil(min_distance_s * rate_hz)` samples
/// are thinned, taller peaks first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakDetector {
    pub threshold_std_factor: f64,
    pub min_distance_s: f64,
    pub min_samples: usize,
}

impl Default for PeakDetector {
    fn default() -> Self {
        Self {
            threshold_std_factor: 0.5,
            min_distance_s: 0.5,
            min_samples: MIN_PEAK_SAMPLES,
        }
    }
}

impl PeakDetector {
    /// Minimum spacing between peaks in samples
    pub fn min_distance_samples(&self, rate_hz: f64) -> usize {
        let distance = (self.min_distance_s * rate_hz).ceil();
        if distance.is_finite() && distance >= 1.0 {
            distance as usize
        } else {
            1
        }
    }

    pub fn detect(&self, filtered: &[f64], rate_hz: f64) -> PeakSet {
        if filtered.len() < self.min_samples.max(3) {
            return PeakSet::empty(rate_hz);
        }

        let stats = ChannelStats::calculate(filtered);
        let threshold = stats.mean + self.threshold_std_factor * stats.std_dev;

        let candidates: Vec<usize> = local_maxima(filtered)
            .into_iter()
            .filter(|&i| filtered[i] >= threshold)
            .collect();

        let distance = self.min_distance_samples(rate_hz);
        PeakSet {
            indices: thin_by_distance(filtered, candidates, distance),
            rate_hz,
        }
    }
}

/// Strict local maxima; a flat top counts once, at its leftmost index
///
/// The first and last samples are never maxima.
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    let n = x.len();
    let mut i = 1;
    while i + 1 < n {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead + 1 < n && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                maxima.push(i);
                i = ahead;
            }
        }
        i += 1;
    }
    maxima
}

/// Drop peaks within `distance` samples of a taller one
///
/// Equal heights favour the earlier index.
fn thin_by_distance(x: &[f64], peaks: Vec<usize>, distance: usize) -> Vec<usize> {
    if distance <= 1 || peaks.len() < 2 {
        return peaks;
    }

    let mut priority: Vec<usize> = (0..peaks.len()).collect();
    priority.sort_by(|&a, &b| x[peaks[b]].total_cmp(&x[peaks[a]]).then(a.cmp(&b)));

    let mut keep = vec![true; peaks.len()];
    for &j in &priority {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            k -= 1;
            keep[k] = false;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .into_iter()
        .zip(keep)
        .filter_map(|(p, kept)| kept.then_some(p))
        .collect()
}

/// Heart-rate estimate; `valid == false` always carries `value_bpm == 0.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateEstimate {
    pub value_bpm: f64,
    pub valid: bool,
}

impl HeartRateEstimate {
    pub fn invalid() -> Self {
        Self {
            value_bpm: 0.0,
            valid: false,
        }
    }

    /// Value if valid
    pub fn bpm(&self) -> Option<f64> {
        self.valid.then_some(self.value_bpm)
    }
}

impl Default for HeartRateEstimate {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Converts inter-peak intervals into beats per minute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateEstimator {
    /// Exclusive lower bound of plausible rates
    pub min_bpm: f64,
    /// Exclusive upper bound of plausible rates
    pub max_bpm: f64,
}

impl Default for HeartRateEstimator {
    fn default() -> Self {
        Self {
            min_bpm: 40.0,
            max_bpm: 200.0,
        }
    }
}

impl HeartRateEstimator {
    pub fn estimate(&self, peaks: &[usize], rate_hz: f64) -> HeartRateEstimate {
        if peaks.len() < 2 || !(rate_hz.is_finite() && rate_hz > 0.0) {
            return HeartRateEstimate::invalid();
        }

        let intervals: Vec<f64> = peaks
            .windows(2)
            .map(|w| (w[1] as f64 - w[0] as f64) / rate_hz)
            .collect();
        let mean_interval = intervals.iter().sum::<f64>() / intervals.len() as f64;
        let bpm = 60.0 / mean_interval;

        if bpm.is_finite() && bpm > self.min_bpm && bpm < self.max_bpm {
            HeartRateEstimate {
                value_bpm: bpm,
                valid: true,
            }
        } else {
            HeartRateEstimate::invalid()
        }
    }
}
