//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP client, HTTP server, metrics registry).
//!
//! Adapter categories:
//! - `binance`: Binance REST API client, signing and connector
//! - `host`: entity store and its HTTP surface
//! - `metrics`: Prometheus gauges and counters

pub mod binance;
pub mod host;
pub mod metrics;
