//! Metrics Adapter
//!
//! Prometheus gauges and counters for entity values and poll outcomes.
//! Served by the host server's `/metrics` route.

pub mod prometheus;

pub use self::prometheus::MetricsRegistry;
