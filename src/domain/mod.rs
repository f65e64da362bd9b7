//! Domain layer - market data and sensor projections.
//!
//! Pure types and functions: no I/O, no async. Balances and tickers
//! come in as `Snapshot`s; `DisplayEntity`s are derived from them.

pub mod account;
pub mod market;
pub mod sensor;
pub mod symbols;

// Re-export core types for convenience
pub use account::Credentials;
pub use market::{BalanceRecord, Snapshot, TickerRecord};
pub use sensor::{DisplayEntity, EntityKind, EntityState, SensorKind};
