//! Binance REST API Adapter
//!
//! Implements the exchange ports against the Binance spot REST API
//! (binance.com, binance.us and other regional domains share it).
//!
//! Sub-modules:
//! - `auth`: HMAC-SHA256 query signing
//! - `client`: rate-limited HTTP client, connector and error mapping
//! - `types`: response body definitions

pub mod auth;
pub mod client;
pub mod types;

pub use client::{BinanceClientConfig, BinanceConnector, BinanceRestClient};
