//! Telemetry module for logging and metrics.
//!
//! Provides:
//! - Logging initialization
//! - Packet and ARP counters, per-interface statistics

mod logging;
mod metrics;

pub use logging::init_logging;
pub use metrics::{Counter, Gauge, InterfaceStats, MetricsRegistry};
