//! Account Scheduler - Setup, Then Periodic Polling
//!
//! One task per account. Setup retries until the first snapshot is
//! available, projects the entity set and registers it with the host.
//! Only after that does the periodic loop start, so entity refreshes
//! never run against an uninitialized adapter.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::domain::Snapshot;
use crate::ports::host::{EntityHost, PollStatus};

use super::poller::{PollingAdapter, RefreshOutcome};
use super::projection::{EntityRegistry, ProjectionConfig, project_entities};

/// Drives one account: adapter, entity projection and host updates.
pub struct AccountScheduler {
  adapter: Arc<PollingAdapter>,
  projection: ProjectionConfig,
  host: Arc<dyn EntityHost>,
  scan_interval: Duration,
}

impl AccountScheduler {
  pub fn new(
    adapter: Arc<PollingAdapter>,
    projection: ProjectionConfig,
    host: Arc<dyn EntityHost>,
    scan_interval: Duration,
  ) -> Self {
    Self {
      adapter,
      projection,
      host,
      scan_interval,
    }
  }

  /// Run setup and then the polling loop until shutdown.
  #[instrument(skip(self, shutdown_rx), fields(account = %self.adapter.account()))]
  pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
    let Some(mut registry) = self.setup(&mut shutdown_rx).await else {
      info!("Shutdown before setup completed");
      return Ok(());
    };

    self
      .host
      .register(self.adapter.account(), registry.render_all());

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Scheduler received shutdown signal");
          break;
        }
        _ = tokio::time::sleep(self.scan_interval) => {
          self.tick(&mut registry).await;
        }
      }
    }

    Ok(())
  }

  /// Wait for the first snapshot and build the entity registry.
  ///
  /// Returns `None` if shutdown arrives first.
  pub async fn setup(
    &self,
    shutdown_rx: &mut broadcast::Receiver<()>,
  ) -> Option<EntityRegistry> {
    let snapshot = loop {
      if let Some(snapshot) = self.try_first_snapshot().await {
        break snapshot;
      }

      let wait = self.adapter.throttle_remaining().max(self.scan_interval);
      warn!(retry_in_secs = wait.as_secs(), "No data yet, retrying setup");
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => return None,
        _ = tokio::time::sleep(wait) => {}
      }
    };

    let entities = project_entities(&self.adapter, &self.projection, &snapshot).await;
    Some(EntityRegistry::new(
      self.adapter.account(),
      self.adapter.subscribe(),
      entities,
    ))
  }

  async fn try_first_snapshot(&self) -> Option<Arc<Snapshot>> {
    let outcome = self.adapter.refresh().await;
    self
      .host
      .record_poll(self.adapter.account(), status_of(&outcome));

    match outcome {
      RefreshOutcome::Updated(snapshot) => Some(snapshot),
      RefreshOutcome::Throttled => {
        let current = self.adapter.snapshot();
        current.is_populated().then_some(current)
      }
      RefreshOutcome::Failed(_) => None,
    }
  }

  /// One polling cycle: refresh, re-read entities, publish.
  ///
  /// Entities are only re-read and published when a new snapshot
  /// arrived; throttled and failed cycles leave the host untouched.
  pub async fn tick(&self, registry: &mut EntityRegistry) -> PollStatus {
    let status = status_of(&self.adapter.refresh().await);
    self.host.record_poll(self.adapter.account(), status);
    if status != PollStatus::Updated {
      return status;
    }

    let refreshed = registry.refresh_all();
    if refreshed < registry.len() {
      warn!(
        refreshed,
        total = registry.len(),
        "Some entities have no record in the current snapshot"
      );
    }
    self
      .host
      .update(self.adapter.account(), registry.render_all());
    status
  }
}

fn status_of(outcome: &RefreshOutcome) -> PollStatus {
  match outcome {
    RefreshOutcome::Updated(_) => PollStatus::Updated,
    RefreshOutcome::Throttled => PollStatus::Throttled,
    RefreshOutcome::Failed(_) => PollStatus::Failed,
  }
}
