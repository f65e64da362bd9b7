//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `ExchangeConnector` / `ExchangeClient`: read-only exchange access
//! - `EntityHost`: the home-automation side that renders entities

pub mod exchange;
pub mod host;

pub use exchange::{ExchangeClient, ExchangeConnector, ExchangeError};
pub use host::{EntityHost, PollStatus};
