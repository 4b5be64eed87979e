//! Vitals-Core: Foundation types for vital-sign stream processing
//!
//! Samples, channel identifiers, alert segments and the shared error type.

pub mod alert;
pub mod channel;
pub mod error;
pub mod sample;
pub mod stats;

pub use alert::AlertSegment;
pub use channel::ChannelId;
pub use error::{VitalsError, VitalsResult};
pub use sample::Sample;
pub use stats::ChannelStats;
