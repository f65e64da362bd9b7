//! Entity Host Port - Where Sensor Entities Are Published
//!
//! The home-automation side of the service. Each account registers
//! its entity set once, after setup, then pushes updated states on
//! every poll tick.

use crate::domain::EntityState;

/// Result of one poll attempt, as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
  /// A new snapshot was swapped in.
  Updated,
  /// The call fell inside the throttle window and was dropped.
  Throttled,
  /// The remote call failed; the previous snapshot was kept.
  Failed,
}

impl PollStatus {
  /// Label used in logs and metrics.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Updated => "updated",
      Self::Throttled => "throttled",
      Self::Failed => "failed",
    }
  }
}

/// Receives entity registrations and state updates.
pub trait EntityHost: Send + Sync + 'static {
  /// Register the full entity set of an account.
  ///
  /// Called once per account, after its first snapshot is available.
  fn register(&self, account: &str, entities: Vec<EntityState>);

  /// Publish refreshed states of an account's entities.
  fn update(&self, account: &str, entities: Vec<EntityState>);

  /// Record the outcome of a poll attempt.
  fn record_poll(&self, account: &str, status: PollStatus);
}
