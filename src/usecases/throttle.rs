//! Throttle - Minimum Spacing Between Remote Calls
//!
//! Debounce, not queueing: a call inside the window is refused and
//! dropped. The window starts when a call is admitted, whether or not
//! that call later succeeds.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Time-window guard admitting at most one call per `min_interval`.
#[derive(Debug)]
pub struct Throttle {
  min_interval: Duration,
  last_admitted: Mutex<Option<Instant>>,
}

impl Throttle {
  pub fn new(min_interval: Duration) -> Self {
    Self {
      min_interval,
      last_admitted: Mutex::new(None),
    }
  }

  /// Admit a call if the window since the last admitted call has
  /// elapsed. Check and update happen under one lock, so two racing
  /// callers can never both be admitted within a window.
  pub fn try_acquire(&self) -> bool {
    let now = Instant::now();
    let mut last = self
      .last_admitted
      .lock()
      .unwrap_or_else(PoisonError::into_inner);

    if let Some(prev) = *last {
      if now.duration_since(prev) < self.min_interval {
        return false;
      }
    }
    *last = Some(now);
    true
  }

  /// Time left before the next call would be admitted.
  pub fn remaining(&self) -> Duration {
    let last = self
      .last_admitted
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    match *last {
      Some(prev) => self.min_interval.saturating_sub(prev.elapsed()),
      None => Duration::ZERO,
    }
  }

  pub fn min_interval(&self) -> Duration {
    self.min_interval
  }
}
