//! Coefficient design for the filter bank
//!
//! Band-pass: Butterworth analog prototype, low-pass to band-pass transform,
//! bilinear transform with pre-warped band edges, conjugate pole pairs
//! grouped into biquads. Notch: the standard second-order IIR notch.

use crate::filters::BiquadSection;
use num_complex::Complex64;
use std::f64::consts::PI;

/// Imaginary parts below this are treated as real poles
const REAL_POLE_TOLERANCE: f64 = 1e-12;

/// Poles of the normalized analog Butterworth low-pass of `order`
fn butterworth_prototype_poles(order: usize) -> Vec<Complex64> {
    let n = order as f64;
    (0..order)
        .map(|k| {
            let m = -n + 1.0 + 2.0 * k as f64;
            -Complex64::from_polar(1.0, PI * m / (2.0 * n))
        })
        .collect()
}

/// Digital Butterworth band-pass as second-order sections
///
/// Produces `order` sections. Each section carries one zero at `z = 1` and
/// one at `z = -1`; the overall gain sits on the first section and gives
/// unit magnitude at the centre of the pass band. Inputs must already be
/// validated (`0 < low < high < fs / 2`).
pub fn butterworth_bandpass(order: usize, low_hz: f64, high_hz: f64, sampling_rate_hz: f64) -> Vec<BiquadSection> {
    let fs2 = 2.0 * sampling_rate_hz;

    // Pre-warp band edges onto the analog axis
    let w_low = fs2 * (PI * low_hz / sampling_rate_hz).tan();
    let w_high = fs2 * (PI * high_hz / sampling_rate_hz).tan();
    let bandwidth = w_high - w_low;
    let center_sq = w_low * w_high;

    let mut analog_poles = Vec::with_capacity(2 * order);
    for pole in butterworth_prototype_poles(order) {
        let scaled = pole * (bandwidth / 2.0);
        let offset = (scaled * scaled - center_sq).sqrt();
        analog_poles.push(scaled + offset);
        analog_poles.push(scaled - offset);
    }

    // Gain: bandwidth^N from the transform, fs2^N / prod(fs2 - p) from the bilinear map
    let denominator = analog_poles
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, &p| acc * (fs2 - p));
    let numerator = (bandwidth * fs2).powi(order as i32);
    let gain = (Complex64::new(numerator, 0.0) / denominator).re;

    let digital_poles: Vec<Complex64> = analog_poles
        .iter()
        .map(|&p| (fs2 + p) / (fs2 - p))
        .collect();

    let mut denominators = pair_poles(&digital_poles);
    // Poles nearest the unit circle run last
    denominators.sort_by(|a, b| a.1.total_cmp(&b.1));

    denominators
        .into_iter()
        .enumerate()
        .map(|(i, (a1, a2))| {
            let k = if i == 0 { gain } else { 1.0 };
            BiquadSection::new([k, 0.0, -k], [1.0, a1, a2])
        })
        .collect()
}

/// Group poles into real second-order denominators `(a1, a2)`
fn pair_poles(poles: &[Complex64]) -> Vec<(f64, f64)> {
    let mut pairs = Vec::with_capacity(poles.len() / 2);
    let mut real_poles = Vec::new();

    for pole in poles {
        if pole.im > REAL_POLE_TOLERANCE {
            // The conjugate carries the other half of the pair
            pairs.push((-2.0 * pole.re, pole.norm_sqr()));
        } else if pole.im.abs() <= REAL_POLE_TOLERANCE {
            real_poles.push(pole.re);
        }
    }

    real_poles.sort_by(|a, b| a.total_cmp(b));
    for chunk in real_poles.chunks(2) {
        match chunk {
            [r1, r2] => pairs.push((-(r1 + r2), r1 * r2)),
            [r] => pairs.push((-r, 0.0)),
            _ => {}
        }
    }

    pairs
}

/// Second-order IIR notch at `center_hz` with quality factor `q`
///
/// The -3 dB bandwidth is `center_hz / q`.
pub fn iir_notch(center_hz: f64, q: f64, sampling_rate_hz: f64) -> BiquadSection {
    let w0 = 2.0 * PI * center_hz / sampling_rate_hz;
    let bw = w0 / q;
    let beta = (bw / 2.0).tan();
    let gain = 1.0 / (1.0 + beta);
    let cos_w0 = w0.cos();

    BiquadSection::new(
        [gain, -2.0 * gain * cos_w0, gain],
        [1.0, -2.0 * gain * cos_w0, 2.0 * gain - 1.0],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prototype_poles_on_unit_circle() {
        for order in 1..=6 {
            let poles = butterworth_prototype_poles(order);
            assert_eq!(poles.len(), order);
            for p in poles {
                assert!((p.norm() - 1.0).abs() < 1e-12);
                assert!(p.re < 0.0, "prototype must be stable");
            }
        }
    }

    #[test]
    fn test_bandpass_sections_are_stable() {
        for order in 1..=6 {
            let sections = butterworth_bandpass(order, 0.5, 15.0, 100.0);
            assert_eq!(sections.len(), order);
            for s in &sections {
                // Stability triangle for a2 z^-2 + a1 z^-1 + 1
                assert!(s.a2.abs() < 1.0);
                assert!(s.a1.abs() < 1.0 + s.a2);
            }
        }
    }

    #[test]
    fn test_bandpass_zeros_at_dc_and_nyquist() {
        let sections = butterworth_bandpass(4, 0.5, 50.0, 250.0);
        for s in &sections {
            assert!((s.b0 + s.b1 + s.b2).abs() < 1e-15);
            assert!((s.b0 - s.b1 + s.b2).abs() < 1e-15);
        }
    }

    #[test]
    fn test_notch_coefficients() {
        let s = iir_notch(50.0, 30.0, 250.0);
        assert!((s.b0 - s.b2).abs() < 1e-15);
        assert!((s.b1 - s.a1).abs() < 1e-15);
        assert!(s.a2 < 1.0 && s.a2 > 0.9);
    }
}
