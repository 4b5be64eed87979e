//! Vitals-Simulation: Synthetic bedside vital signs
//!
//! Seeded PPG, EEG index, heart-rate and SpO2 generation with clinical
//! episode patterns, for tests, benchmarks and the development harness.

pub mod real_time_stream;
pub mod signal_patterns;
pub mod vitals_simulator;

pub use real_time_stream::*;
pub use signal_patterns::*;
pub use vitals_simulator::*;
