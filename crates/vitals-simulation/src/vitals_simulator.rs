//! Bedside vital-sign simulator
//!
//! Produces a merged multi-rate sample stream: PPG and EEG waveforms at
//! their own rates plus heart-rate and SpO2 summaries. All sources run on a
//! common integer tick grid, so coincident samples share one timestamp.

use crate::signal_patterns::{VitalPattern, VitalTargets};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use vitals_core::{ChannelId, Sample, VitalsError, VitalsResult};

/// Configuration for vital-sign simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// PPG rate in Hz; `None` disables the waveform
    pub ppg_rate_hz: Option<u32>,
    /// EEG index rate in Hz; `None` disables it
    pub eeg_rate_hz: Option<u32>,
    /// Heart-rate and SpO2 summary rate in Hz; `None` disables both
    pub summary_rate_hz: Option<u32>,
    pub pattern: VitalPattern,
    /// PPG DC level in ADC counts
    pub ppg_baseline: f64,
    pub ppg_amplitude: f64,
    /// Amplitude of the 10 Hz ripple riding on the EEG index
    pub eeg_ripple: f64,
    /// Power line interference on the EEG trace (frequency, amplitude)
    pub powerline: Option<(f64, f64)>,
    pub noise: NoiseConfig,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

/// Noise configuration for the simulated channels
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Gaussian noise on the PPG waveform
    pub ppg_std: f64,
    /// Gaussian noise on the EEG index
    pub eeg_std: f64,
    /// Gaussian jitter on heart-rate and SpO2 summaries
    pub summary_std: f64,
    /// Slow baseline drift amplitude on the PPG
    pub baseline_wander: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            ppg_std: 1.0,
            eeg_std: 0.5,
            summary_std: 0.5,
            baseline_wander: 4.0,
        }
    }
}

impl NoiseConfig {
    /// Noise-free configuration
    pub fn none() -> Self {
        Self {
            ppg_std: 0.0,
            eeg_std: 0.0,
            summary_std: 0.0,
            baseline_wander: 0.0,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            ppg_rate_hz: Some(100),
            eeg_rate_hz: Some(250),
            summary_rate_hz: Some(1),
            pattern: VitalPattern::Stable,
            ppg_baseline: 512.0,
            ppg_amplitude: 60.0,
            eeg_ripple: 2.0,
            powerline: Some((50.0, 1.5)),
            noise: NoiseConfig::default(),
            seed: None,
        }
    }
}

impl SimulatorConfig {
    /// 1 Hz heart rate, SpO2 and BIS index, as found in summary recordings
    pub fn summary_only() -> Self {
        Self {
            ppg_rate_hz: None,
            eeg_rate_hz: Some(1),
            summary_rate_hz: Some(1),
            eeg_ripple: 0.0,
            powerline: None,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> VitalsResult<()> {
        let rates = [self.ppg_rate_hz, self.eeg_rate_hz, self.summary_rate_hz];
        if rates.iter().all(Option::is_none) {
            return Err(VitalsError::Simulation {
                reason: "at least one source must be enabled".to_string(),
            });
        }
        if rates.iter().flatten().any(|r| *r == 0) {
            return Err(VitalsError::Simulation {
                reason: "source rates must be greater than 0 Hz".to_string(),
            });
        }

        let noise = &self.noise;
        let magnitudes = [
            self.ppg_amplitude,
            self.eeg_ripple,
            noise.ppg_std,
            noise.eeg_std,
            noise.summary_std,
            noise.baseline_wander,
        ];
        if magnitudes.iter().any(|v| !(v.is_finite() && *v >= 0.0)) || !self.ppg_baseline.is_finite() {
            return Err(VitalsError::Simulation {
                reason: "amplitudes and noise levels must be finite and non-negative".to_string(),
            });
        }

        if let Some((freq, amplitude)) = self.powerline {
            if !(freq.is_finite() && freq > 0.0 && amplitude.is_finite() && amplitude >= 0.0) {
                return Err(VitalsError::Simulation {
                    reason: format!("invalid power line interference ({} Hz, {})", freq, amplitude),
                });
            }
        }

        Ok(())
    }

    /// Tick rate of the common grid: lowest common multiple of enabled rates
    fn tick_rate(&self) -> u64 {
        [self.ppg_rate_hz, self.eeg_rate_hz, self.summary_rate_hz]
            .iter()
            .flatten()
            .fold(1u64, |acc, &r| lcm(acc, u64::from(r)))
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: u64, b: u64) -> u64 {
    a / gcd(a, b) * b
}

/// Vital-sign simulator
pub struct VitalsSimulator {
    config: SimulatorConfig,
    rng: StdRng,
    ppg_noise: Normal<f64>,
    eeg_noise: Normal<f64>,
    summary_noise: Normal<f64>,
    tick_rate: u64,
    tick: u64,
    /// Cardiac cycle phase in cycles
    pulse_phase: f64,
}

impl VitalsSimulator {
    /// Create new simulator with configuration
    pub fn new(config: SimulatorConfig) -> VitalsResult<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(VitalsSimulator {
            ppg_noise: normal(config.noise.ppg_std)?,
            eeg_noise: normal(config.noise.eeg_std)?,
            summary_noise: normal(config.noise.summary_std)?,
            tick_rate: config.tick_rate(),
            config,
            rng,
            tick: 0,
            pulse_phase: 0.0,
        })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Simulation time of the next sample slot in seconds
    pub fn elapsed(&self) -> f64 {
        self.tick as f64 / self.tick_rate as f64
    }

    /// Produce the next sample on the grid
    pub fn next_sample(&mut self) -> Sample {
        loop {
            let tick = self.tick;
            self.tick += 1;
            if let Some(sample) = self.sample_at(tick) {
                return sample;
            }
        }
    }

    /// Generate all samples in the next `duration` seconds
    pub fn generate(&mut self, duration: f64) -> VitalsResult<Vec<Sample>> {
        if !(duration.is_finite() && duration >= 0.0) {
            return Err(VitalsError::Simulation {
                reason: format!("duration {} must be finite and non-negative", duration),
            });
        }

        let end_tick = self.tick + (duration * self.tick_rate as f64).round() as u64;
        let mut samples = Vec::new();
        while self.tick < end_tick {
            let tick = self.tick;
            self.tick += 1;
            if let Some(sample) = self.sample_at(tick) {
                samples.push(sample);
            }
        }
        Ok(samples)
    }

    /// Sample for one grid tick, if any source is due
    fn sample_at(&mut self, tick: u64) -> Option<Sample> {
        let ppg_due = self.is_due(tick, self.config.ppg_rate_hz);
        let eeg_due = self.is_due(tick, self.config.eeg_rate_hz);
        let summary_due = self.is_due(tick, self.config.summary_rate_hz);
        if !(ppg_due || eeg_due || summary_due) {
            return None;
        }

        let time = tick as f64 / self.tick_rate as f64;
        let targets = self.config.pattern.targets_at(time);
        let mut sample = Sample::new(time);

        if ppg_due {
            sample = sample.with(ChannelId::Ppg, self.ppg_value(time, &targets));
        }
        if eeg_due {
            sample = sample.with(ChannelId::Eeg, self.eeg_value(time, &targets));
        }
        if summary_due {
            let hr = (targets.heart_rate_bpm + self.summary_noise.sample(&mut self.rng)).round();
            let spo2 = (targets.spo2_percent + self.summary_noise.sample(&mut self.rng))
                .round()
                .min(100.0);
            sample = sample.with(ChannelId::HeartRate, hr).with(ChannelId::Spo2, spo2);
        }
        Some(sample)
    }

    /// Reset simulation time and cardiac phase
    pub fn reset_time(&mut self) {
        self.tick = 0;
        self.pulse_phase = 0.0;
    }

    /// Update configuration, keeping the current time
    pub fn update_config(&mut self, config: SimulatorConfig) -> VitalsResult<()> {
        config.validate()?;
        let elapsed = self.elapsed();

        self.ppg_noise = normal(config.noise.ppg_std)?;
        self.eeg_noise = normal(config.noise.eeg_std)?;
        self.summary_noise = normal(config.noise.summary_std)?;
        self.tick_rate = config.tick_rate();
        self.tick = (elapsed * self.tick_rate as f64).round() as u64;
        self.config = config;
        Ok(())
    }

    pub fn set_pattern(&mut self, pattern: VitalPattern) {
        self.config.pattern = pattern;
    }

    fn is_due(&self, tick: u64, rate: Option<u32>) -> bool {
        match rate {
            Some(r) => tick % (self.tick_rate / u64::from(r)) == 0,
            None => false,
        }
    }

    /// Pulse waveform: systolic upstroke followed by a dicrotic wave
    fn ppg_value(&mut self, time: f64, targets: &VitalTargets) -> f64 {
        let p = self.pulse_phase.fract();
        let systolic = (-((p - 0.25) / 0.08).powi(2)).exp();
        let dicrotic = 0.35 * (-((p - 0.55) / 0.10).powi(2)).exp();

        if let Some(rate) = self.config.ppg_rate_hz {
            self.pulse_phase += targets.heart_rate_bpm / 60.0 / f64::from(rate);
        }

        let wander = self.config.noise.baseline_wander * (2.0 * PI * 0.1 * time).sin();
        self.config.ppg_baseline
            + self.config.ppg_amplitude * (systolic + dicrotic)
            + wander
            + self.ppg_noise.sample(&mut self.rng)
    }

    fn eeg_value(&mut self, time: f64, targets: &VitalTargets) -> f64 {
        let mut value = targets.bis_index
            + self.config.eeg_ripple * (2.0 * PI * 10.0 * time).sin()
            + self.eeg_noise.sample(&mut self.rng);

        if let Some((freq, amplitude)) = self.config.powerline {
            value += amplitude * (2.0 * PI * freq * time).sin();
        }

        value
    }
}

fn normal(std_dev: f64) -> VitalsResult<Normal<f64>> {
    Normal::new(0.0, std_dev).map_err(|e| VitalsError::Simulation {
        reason: format!("Failed to create normal distribution: {}", e),
    })
}
