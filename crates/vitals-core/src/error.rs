//! Error handling for the Vitals Framework
//!
//! Per-sample errors are local and recoverable (the session keeps running);
//! configuration errors are fatal and surface before any processing starts.
//! Conditions that are *not* errors, such as insufficient filter history or
//! an implausible heart rate, are modelled as explicit values elsewhere.

use core::fmt;

/// Result type alias for Vitals Framework operations
pub type VitalsResult<T> = Result<T, VitalsError>;

/// Error type for all Vitals Framework operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum VitalsError {
    /// Sample rejected at ingestion (NaN, negative or out-of-order timestamp)
    InvalidSample {
        /// Description of the violated constraint
        reason: String,
    },

    /// Filter specification violates its frequency constraints
    FilterConfiguration {
        /// Description of the configuration error
        reason: String,
    },

    /// Processing configuration is inconsistent
    InvalidConfig {
        /// Description of the configuration error
        reason: String,
    },

    /// Caller passed malformed arguments to a pure operation
    InvalidInput {
        /// Description of the input problem
        reason: String,
    },

    /// Session has already been closed
    SessionClosed,

    /// Serialization/deserialization error
    Serialization {
        /// Serialization error description
        reason: String,
    },

    /// Synthetic data generation failed
    Simulation {
        /// Simulation error description
        reason: String,
    },
}

impl VitalsError {
    /// Whether the session can keep running after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, VitalsError::InvalidSample { .. } | VitalsError::InvalidInput { .. })
    }
}

impl fmt::Display for VitalsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VitalsError::InvalidSample { reason } => {
                write!(f, "Invalid sample: {}", reason)
            }
            VitalsError::FilterConfiguration { reason } => {
                write!(f, "Filter configuration error: {}", reason)
            }
            VitalsError::InvalidConfig { reason } => {
                write!(f, "Invalid configuration: {}", reason)
            }
            VitalsError::InvalidInput { reason } => {
                write!(f, "Invalid input: {}", reason)
            }
            VitalsError::SessionClosed => {
                write!(f, "Session is closed")
            }
            VitalsError::Serialization { reason } => {
                write!(f, "Serialization error: {}", reason)
            }
            VitalsError::Simulation { reason } => {
                write!(f, "Simulation error: {}", reason)
            }
        }
    }
}

impl std::error::Error for VitalsError {}

/// Convenience macro for creating sample rejection errors
#[macro_export]
macro_rules! invalid_sample {
    ($($arg:tt)+) => {
        $crate::error::VitalsError::InvalidSample {
            reason: format!($($arg)+)
        }
    };
}

/// Convenience macro for creating filter configuration errors
#[macro_export]
macro_rules! filter_config_error {
    ($($arg:tt)+) => {
        $crate::error::VitalsError::FilterConfiguration {
            reason: format!($($arg)+)
        }
    };
}
