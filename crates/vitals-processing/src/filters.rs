//! Digital filters for vital-sign waveforms
//!
//! Filters are designed once from a [`FilterSpec`] and applied as pure
//! transforms over a whole channel buffer: every call starts from its own
//! initial state, so re-filtering the same window always gives the same
//! output. Band-pass filters run causally; notch filters run forward and
//! backward (zero phase).

use crate::design;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vitals_core::{filter_config_error, ChannelId, VitalsResult};

/// Buffers shorter than this are returned unfiltered
pub const MIN_HISTORY: usize = 20;

/// Filter types supported by the framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    /// Butterworth band-pass, single forward pass
    BandPass,
    /// Mains notch, forward-backward
    Notch,
}

/// Filter design parameters
///
/// Built through [`FilterSpec::bandpass`] or [`FilterSpec::notch`]; the
/// fields that do not apply to the kind stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub kind: FilterKind,
    /// Prototype order (band-pass); notch filters are always second order
    pub order: usize,
    pub low_cutoff_hz: Option<f64>,
    pub high_cutoff_hz: Option<f64>,
    pub center_hz: Option<f64>,
    pub quality_factor: Option<f64>,
    pub sampling_rate_hz: f64,
}

impl FilterSpec {
    /// Band-pass parameters
    pub fn bandpass(low_cutoff_hz: f64, high_cutoff_hz: f64, order: usize, sampling_rate_hz: f64) -> Self {
        Self {
            kind: FilterKind::BandPass,
            order,
            low_cutoff_hz: Some(low_cutoff_hz),
            high_cutoff_hz: Some(high_cutoff_hz),
            center_hz: None,
            quality_factor: None,
            sampling_rate_hz,
        }
    }

    /// Notch parameters
    pub fn notch(center_hz: f64, quality_factor: f64, sampling_rate_hz: f64) -> Self {
        Self {
            kind: FilterKind::Notch,
            order: 2,
            low_cutoff_hz: None,
            high_cutoff_hz: None,
            center_hz: Some(center_hz),
            quality_factor: Some(quality_factor),
            sampling_rate_hz,
        }
    }

    pub fn nyquist_hz(&self) -> f64 {
        0.5 * self.sampling_rate_hz
    }

    /// Check the frequency constraints for the filter kind
    pub fn validate(&self) -> VitalsResult<()> {
        let fs = self.sampling_rate_hz;
        if !(fs.is_finite() && fs > 0.0) {
            return Err(filter_config_error!("sampling rate {} Hz must be positive", fs));
        }
        let nyquist = self.nyquist_hz();

        match self.kind {
            FilterKind::BandPass => {
                let (low, high) = match (self.low_cutoff_hz, self.high_cutoff_hz) {
                    (Some(low), Some(high)) => (low, high),
                    _ => {
                        return Err(filter_config_error!(
                            "band-pass filter requires low and high cutoff frequencies"
                        ))
                    }
                };
                if self.order == 0 {
                    return Err(filter_config_error!("band-pass order must be at least 1"));
                }
                if !(low > 0.0 && low < high && high < nyquist) {
                    return Err(filter_config_error!(
                        "band-pass cutoffs must satisfy 0 < {} < {} < {} Hz (Nyquist)",
                        low,
                        high,
                        nyquist
                    ));
                }
            }
            FilterKind::Notch => {
                let center = self
                    .center_hz
                    .ok_or_else(|| filter_config_error!("notch filter requires a center frequency"))?;
                let q = self
                    .quality_factor
                    .ok_or_else(|| filter_config_error!("notch filter requires a quality factor"))?;
                if !(center > 0.0 && center < nyquist) {
                    return Err(filter_config_error!(
                        "notch center must satisfy 0 < {} < {} Hz (Nyquist)",
                        center,
                        nyquist
                    ));
                }
                if !(q.is_finite() && q > 0.0) {
                    return Err(filter_config_error!("notch quality factor {} must be positive", q));
                }
            }
        }
        Ok(())
    }
}

/// Single biquad section (2nd order), coefficients only
///
/// `y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]`,
/// evaluated in transposed direct form II.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadSection {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadSection {
    pub fn new(b: [f64; 3], a: [f64; 3]) -> Self {
        let a0 = a[0];
        Self {
            b0: b[0] / a0,
            b1: b[1] / a0,
            b2: b[2] / a0,
            a1: a[1] / a0,
            a2: a[2] / a0,
        }
    }

    #[inline]
    fn process_sample(&self, input: f64, state: &mut [f64; 2]) -> f64 {
        let output = self.b0 * input + state[0];
        state[0] = self.b1 * input - self.a1 * output + state[1];
        state[1] = self.b2 * input - self.a2 * output;
        output
    }

    /// State that makes the section's response to a unit step constant
    fn steady_state(&self) -> [f64; 2] {
        let denom = 1.0 + self.a1 + self.a2;
        let s0 = (self.b1 - self.a1 * self.b0 + self.b2 - self.a2 * self.b0) / denom;
        let s1 = self.b2 - self.a2 * self.b0 - self.a2 * s0;
        [s0, s1]
    }

    /// DC gain `H(1)`
    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// Complex frequency response at `freq_hz`
    pub fn response(&self, freq_hz: f64, sampling_rate_hz: f64) -> Complex64 {
        let w = 2.0 * std::f64::consts::PI * freq_hz / sampling_rate_hz;
        let z1 = Complex64::from_polar(1.0, -w);
        let z2 = z1 * z1;
        (self.b0 + z1 * self.b1 + z2 * self.b2) / (1.0 + z1 * self.a1 + z2 * self.a2)
    }
}

/// Run a cascade of sections over `input` starting from `states`
fn run_cascade(sections: &[BiquadSection], input: &[f64], states: &mut [[f64; 2]]) -> Vec<f64> {
    input
        .iter()
        .map(|&x| {
            sections
                .iter()
                .zip(states.iter_mut())
                .fold(x, |sample, (section, state)| section.process_sample(sample, state))
        })
        .collect()
}

/// Cascade steady state for a unit step, each section scaled by the DC gain before it
fn cascade_steady_state(sections: &[BiquadSection]) -> Vec<[f64; 2]> {
    let mut scale = 1.0;
    sections
        .iter()
        .map(|section| {
            let zi = section.steady_state();
            let scaled = [zi[0] * scale, zi[1] * scale];
            scale *= section.dc_gain();
            scaled
        })
        .collect()
}

/// Causal filtering from rest
pub fn sosfilt(sections: &[BiquadSection], input: &[f64]) -> Vec<f64> {
    let mut states = vec![[0.0; 2]; sections.len()];
    run_cascade(sections, input, &mut states)
}

/// Zero-phase forward-backward filtering
///
/// The input is extended at both ends by odd reflection, and each pass is
/// seeded with the steady state scaled by its first value, so constant
/// segments pass through without edge transients.
pub fn filtfilt(sections: &[BiquadSection], input: &[f64]) -> Vec<f64> {
    let n = input.len();
    if n < 2 || sections.is_empty() {
        return input.to_vec();
    }

    let pad = (3 * (2 * sections.len() + 1)).min(n - 1);
    let first = input[0];
    let last = input[n - 1];

    let mut extended = Vec::with_capacity(n + 2 * pad);
    extended.extend((1..=pad).rev().map(|i| 2.0 * first - input[i]));
    extended.extend_from_slice(input);
    extended.extend((1..=pad).map(|i| 2.0 * last - input[n - 1 - i]));

    let zi = cascade_steady_state(sections);

    let x0 = extended[0];
    let mut states: Vec<[f64; 2]> = zi.iter().map(|s| [s[0] * x0, s[1] * x0]).collect();
    let mut forward = run_cascade(sections, &extended, &mut states);

    forward.reverse();
    let y0 = forward[0];
    let mut states: Vec<[f64; 2]> = zi.iter().map(|s| [s[0] * y0, s[1] * y0]).collect();
    let mut backward = run_cascade(sections, &forward, &mut states);
    backward.reverse();

    backward[pad..pad + n].to_vec()
}

/// Filter with coefficients designed from a [`FilterSpec`]
#[derive(Debug, Clone, PartialEq)]
pub struct DesignedFilter {
    spec: FilterSpec,
    sections: Vec<BiquadSection>,
}

impl DesignedFilter {
    /// Validate the parameters and compute coefficients
    pub fn design(spec: &FilterSpec) -> VitalsResult<Self> {
        spec.validate()?;

        let sections = match spec.kind {
            FilterKind::BandPass => {
                // validate() guarantees both cutoffs are present
                let low = spec.low_cutoff_hz.unwrap_or_default();
                let high = spec.high_cutoff_hz.unwrap_or_default();
                design::butterworth_bandpass(spec.order, low, high, spec.sampling_rate_hz)
            }
            FilterKind::Notch => {
                let center = spec.center_hz.unwrap_or_default();
                let q = spec.quality_factor.unwrap_or_default();
                vec![design::iir_notch(center, q, spec.sampling_rate_hz)]
            }
        };

        Ok(Self {
            spec: spec.clone(),
            sections,
        })
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn sections(&self) -> &[BiquadSection] {
        &self.sections
    }

    /// Filter a buffer without the minimum-history check
    pub fn filter(&self, samples: &[f64]) -> Vec<f64> {
        match self.spec.kind {
            FilterKind::BandPass => sosfilt(&self.sections, samples),
            FilterKind::Notch => filtfilt(&self.sections, samples),
        }
    }

    /// Magnitude of the cascade response at `freq_hz`
    pub fn magnitude_at(&self, freq_hz: f64) -> f64 {
        self.sections
            .iter()
            .map(|s| s.response(freq_hz, self.spec.sampling_rate_hz))
            .fold(Complex64::new(1.0, 0.0), |acc, h| acc * h)
            .norm()
    }
}

/// Design a filter and apply it once
///
/// Buffers shorter than [`MIN_HISTORY`] are returned unchanged.
pub fn apply(spec: &FilterSpec, samples: &[f64]) -> VitalsResult<Vec<f64>> {
    let filter = DesignedFilter::design(spec)?;
    if samples.len() < MIN_HISTORY {
        return Ok(samples.to_vec());
    }
    Ok(filter.filter(samples))
}

/// Per-channel filter chains, designed once per session
#[derive(Debug, Clone, Default)]
pub struct FilterBank {
    chains: BTreeMap<ChannelId, Vec<DesignedFilter>>,
    min_history: usize,
}

impl FilterBank {
    /// Create an empty filter bank
    pub fn new(min_history: usize) -> Self {
        FilterBank {
            chains: BTreeMap::new(),
            min_history,
        }
    }

    /// Design and append a filter to a channel's chain
    pub fn add_filter(&mut self, channel: ChannelId, spec: &FilterSpec) -> VitalsResult<()> {
        let filter = DesignedFilter::design(spec)?;
        self.chains.entry(channel).or_default().push(filter);
        Ok(())
    }

    /// Filter chain for a channel (empty if the channel is unfiltered)
    pub fn chain(&self, channel: ChannelId) -> &[DesignedFilter] {
        self.chains.get(&channel).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn min_history(&self) -> usize {
        self.min_history
    }

    /// Apply a channel's chain in order
    ///
    /// Output length always equals input length; short buffers and channels
    /// without filters pass through.
    pub fn apply(&self, channel: ChannelId, samples: &[f64]) -> Vec<f64> {
        let chain = self.chain(channel);
        if chain.is_empty() || samples.len() < self.min_history {
            return samples.to_vec();
        }

        chain
            .iter()
            .fold(samples.to_vec(), |current, filter| filter.filter(&current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use vitals_core::VitalsError;

    fn tone(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
    }

    #[test]
    fn test_bandpass_validation() {
        assert!(FilterSpec::bandpass(0.5, 15.0, 4, 100.0).validate().is_ok());

        let above_nyquist = FilterSpec::bandpass(0.5, 60.0, 4, 100.0);
        assert!(matches!(
            above_nyquist.validate(),
            Err(VitalsError::FilterConfiguration { .. })
        ));

        assert!(FilterSpec::bandpass(10.0, 5.0, 4, 100.0).validate().is_err());
        assert!(FilterSpec::bandpass(0.0, 5.0, 4, 100.0).validate().is_err());
        assert!(FilterSpec::bandpass(0.5, 15.0, 0, 100.0).validate().is_err());
        assert!(FilterSpec::bandpass(0.5, 15.0, 4, 0.0).validate().is_err());
    }

    #[test]
    fn test_notch_validation() {
        assert!(FilterSpec::notch(50.0, 30.0, 250.0).validate().is_ok());
        // 50 Hz sits exactly on the Nyquist frequency at 100 Hz
        assert!(FilterSpec::notch(50.0, 30.0, 100.0).validate().is_err());
        assert!(FilterSpec::notch(50.0, 0.0, 250.0).validate().is_err());
    }

    #[test]
    fn test_apply_preserves_length() {
        let specs = [
            FilterSpec::bandpass(0.5, 15.0, 4, 100.0),
            FilterSpec::bandpass(0.5, 50.0, 4, 250.0),
            FilterSpec::bandpass(1.0, 3.0, 3, 20.0),
            FilterSpec::notch(50.0, 30.0, 250.0),
            FilterSpec::notch(60.0, 10.0, 500.0),
        ];
        for spec in &specs {
            for n in [20, 21, 64, 500] {
                let input = tone(1.2, spec.sampling_rate_hz, n);
                assert_eq!(apply(spec, &input).unwrap().len(), n, "{:?} n={}", spec.kind, n);
            }
        }
    }

    #[test]
    fn test_short_input_passthrough() {
        let spec = FilterSpec::bandpass(0.5, 15.0, 4, 100.0);
        for n in 0..MIN_HISTORY {
            let input: Vec<f64> = (0..n).map(|i| i as f64 * 3.5 - 7.0).collect();
            assert_eq!(apply(&spec, &input).unwrap(), input);
        }

        let notch = FilterSpec::notch(50.0, 30.0, 250.0);
        let input = vec![1.0, -2.0, 3.0];
        assert_eq!(apply(&notch, &input).unwrap(), input);
    }

    #[test]
    fn test_apply_rejects_bad_spec() {
        let spec = FilterSpec::bandpass(0.5, 80.0, 4, 100.0);
        assert!(apply(&spec, &[0.0; 40]).is_err());
    }

    #[test]
    fn test_bandpass_response_shape() {
        let filter = DesignedFilter::design(&FilterSpec::bandpass(0.5, 15.0, 4, 100.0)).unwrap();
        assert_eq!(filter.sections().len(), 4);

        // Unit gain at the warped geometric centre
        let fs = 100.0;
        let warp = |f: f64| (PI * f / fs).tan();
        let center = (warp(0.5) * warp(15.0)).sqrt().atan() * fs / PI;
        assert!((filter.magnitude_at(center) - 1.0).abs() < 1e-9);

        // -3 dB at both cutoffs
        let half_power = std::f64::consts::FRAC_1_SQRT_2;
        assert!((filter.magnitude_at(0.5) - half_power).abs() < 1e-6);
        assert!((filter.magnitude_at(15.0) - half_power).abs() < 1e-6);

        // Stop bands
        assert!(filter.magnitude_at(0.01) < 1e-3);
        assert!(filter.magnitude_at(45.0) < 1e-3);
    }

    #[test]
    fn test_notch_response() {
        let filter = DesignedFilter::design(&FilterSpec::notch(50.0, 30.0, 250.0)).unwrap();
        assert!(filter.magnitude_at(50.0) < 1e-9);
        assert!((filter.magnitude_at(10.0) - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_zero_phase_keeps_constant_signal() {
        let filter = DesignedFilter::design(&FilterSpec::notch(50.0, 30.0, 250.0)).unwrap();
        let input = vec![42.0; 100];
        let output = filter.filter(&input);
        for value in output {
            assert!((value - 42.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_phase_has_no_lag() {
        // A 5 Hz tone is far from the notch: forward-backward output must stay in phase
        let fs = 250.0;
        let input = tone(5.0, fs, 1000);
        let filter = DesignedFilter::design(&FilterSpec::notch(50.0, 30.0, fs)).unwrap();
        let output = filter.filter(&input);
        for i in 100..900 {
            assert!((output[i] - input[i]).abs() < 1e-2, "sample {}", i);
        }
    }

    #[test]
    fn test_filter_bank_chains() {
        let mut bank = FilterBank::new(MIN_HISTORY);
        bank.add_filter(ChannelId::Eeg, &FilterSpec::bandpass(0.5, 50.0, 4, 250.0)).unwrap();
        bank.add_filter(ChannelId::Eeg, &FilterSpec::notch(50.0, 30.0, 250.0)).unwrap();

        assert_eq!(bank.chain(ChannelId::Eeg).len(), 2);
        assert!(bank.chain(ChannelId::Spo2).is_empty());

        let spo2 = vec![97.0; 50];
        assert_eq!(bank.apply(ChannelId::Spo2, &spo2), spo2);

        let eeg = tone(10.0, 250.0, 300);
        let filtered = bank.apply(ChannelId::Eeg, &eeg);
        assert_eq!(filtered.len(), eeg.len());
        assert_ne!(filtered, eeg);

        let short = vec![1.0; MIN_HISTORY - 1];
        assert_eq!(bank.apply(ChannelId::Eeg, &short), short);
    }

    #[test]
    fn test_filter_bank_rejects_invalid_spec() {
        let mut bank = FilterBank::new(MIN_HISTORY);
        let result = bank.add_filter(ChannelId::Ppg, &FilterSpec::notch(50.0, 30.0, 100.0));
        assert!(matches!(result, Err(VitalsError::FilterConfiguration { .. })));
        assert!(bank.chain(ChannelId::Ppg).is_empty());
    }

    #[test]
    fn test_recompute_is_bit_identical() {
        let filter = DesignedFilter::design(&FilterSpec::bandpass(0.5, 15.0, 4, 100.0)).unwrap();
        let input: Vec<f64> = (0..400).map(|i| ((i * 37) % 101) as f64).collect();
        assert_eq!(filter.filter(&input), filter.filter(&input));
    }
}
