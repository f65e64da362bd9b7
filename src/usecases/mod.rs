//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! service's workflows.
//!
//! Use cases:
//! - `PollingAdapter`: throttled refresh of an account's snapshot
//! - `project_entities` / `EntityRegistry`: sensor entities from snapshots
//! - `AccountScheduler`: setup followed by the periodic polling loop
//! - `Throttle`: minimum spacing between remote calls

pub mod poller;
pub mod projection;
pub mod scheduler;
pub mod throttle;

pub use poller::{PollingAdapter, RefreshOutcome, SnapshotReader};
pub use projection::{EntityRegistry, ProjectionConfig, project_entities};
pub use scheduler::AccountScheduler;
pub use throttle::Throttle;
