//! Vitals-Service: Async monitoring service
//!
//! Drives a stream processor from tokio channels and fans its snapshots
//! out to any number of readers.

pub mod monitor_service;

pub use monitor_service::{start_monitor_service, MonitorCommand, MonitorHandle, MonitorService, MonitorStats};
