//! Entity Host Adapter
//!
//! The home-automation facing side: an in-memory entity store that
//! implements the `EntityHost` port, served over HTTP.

pub mod server;
pub mod store;

pub use server::{HostServer, router};
pub use store::EntityStore;
