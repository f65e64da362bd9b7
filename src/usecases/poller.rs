//! Polling Adapter - Throttled Snapshot Refresh
//!
//! Holds one account's credentials, opens exchange sessions on demand,
//! and keeps the current `Snapshot`. The snapshot lives in a
//! `tokio::sync::watch` channel: `refresh` is the only writer and swaps
//! in a complete new `Arc<Snapshot>`, so readers never observe a
//! half-built one.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{BalanceRecord, Credentials, Snapshot, TickerRecord};
use crate::ports::exchange::{ExchangeClient, ExchangeConnector, ExchangeError};

use super::throttle::Throttle;

/// Read-only handle on an adapter's current snapshot.
pub type SnapshotReader = watch::Receiver<Arc<Snapshot>>;

/// Result of a `refresh` call.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
  /// A new snapshot replaced the previous one.
  Updated(Arc<Snapshot>),
  /// The call fell inside the throttle window; nothing was fetched.
  Throttled,
  /// The remote call failed; the previous snapshot is unchanged.
  Failed(ExchangeError),
}

/// Polls one exchange account and owns its snapshot.
pub struct PollingAdapter {
  /// Account name, for logs.
  account: String,
  credentials: Credentials,
  connector: Arc<dyn ExchangeConnector>,
  /// Open session; `None` until connected or after it was invalidated.
  session: Mutex<Option<Arc<dyn ExchangeClient>>>,
  throttle: Throttle,
  snapshot_tx: watch::Sender<Arc<Snapshot>>,
}

impl PollingAdapter {
  /// Create an adapter with an empty snapshot and no session.
  pub fn new(
    account: &str,
    credentials: Credentials,
    connector: Arc<dyn ExchangeConnector>,
    min_time_between_updates: Duration,
  ) -> Self {
    let (snapshot_tx, _) = watch::channel(Arc::new(Snapshot::empty()));
    Self {
      account: account.to_string(),
      credentials,
      connector,
      session: Mutex::new(None),
      throttle: Throttle::new(min_time_between_updates),
      snapshot_tx,
    }
  }

  pub fn account(&self) -> &str {
    &self.account
  }

  /// Return the open session, connecting first if there is none.
  #[instrument(skip(self), fields(account = %self.account, host = %self.credentials.host()))]
  pub async fn connect(&self) -> Result<Arc<dyn ExchangeClient>, ExchangeError> {
    let mut session = self.session.lock().await;
    if let Some(client) = session.as_ref() {
      return Ok(Arc::clone(client));
    }

    debug!("Connecting to exchange");
    match self.connector.connect(&self.credentials).await {
      Ok(client) => {
        info!("Exchange session established");
        *session = Some(Arc::clone(&client));
        Ok(client)
      }
      Err(e) => {
        error!(error = %e, "Error connecting to exchange");
        Err(e)
      }
    }
  }

  /// Fetch balances and tickers and swap in a new snapshot.
  ///
  /// At most one call per throttle window reaches the exchange; the
  /// rest return `Throttled` immediately. Failures keep the previous
  /// snapshot and drop the session when it is no longer usable.
  #[instrument(skip(self), fields(account = %self.account))]
  pub async fn refresh(&self) -> RefreshOutcome {
    if !self.throttle.try_acquire() {
      debug!(
        remaining_ms = self.throttle.remaining().as_millis() as u64,
        "Refresh throttled"
      );
      return RefreshOutcome::Throttled;
    }

    match self.fetch_snapshot().await {
      Ok(snapshot) => {
        let snapshot = Arc::new(snapshot);
        self.snapshot_tx.send_replace(Arc::clone(&snapshot));
        debug!(
          generation = snapshot.generation(),
          balances = snapshot.balance_count(),
          tickers = snapshot.ticker_count(),
          "Snapshot replaced"
        );
        RefreshOutcome::Updated(snapshot)
      }
      Err(e) => {
        if e.invalidates_session() {
          warn!(error = %e, "Dropping exchange session");
          *self.session.lock().await = None;
        }
        error!(
          error = %e,
          host = %self.credentials.host(),
          "Error fetching data, keeping previous snapshot"
        );
        RefreshOutcome::Failed(e)
      }
    }
  }

  async fn fetch_snapshot(&self) -> Result<Snapshot, ExchangeError> {
    let client = self.connect().await?;

    let (balances, tickers) =
      tokio::try_join!(client.account_balances(), client.all_tickers())?;

    let generation = self.snapshot_tx.borrow().generation() + 1;
    Ok(Snapshot::new(balances, tickers, generation, Utc::now()))
  }

  /// Look up a single pair directly on the exchange, bypassing the
  /// snapshot and the throttle. Used to validate configured pairs.
  #[instrument(skip(self), fields(account = %self.account))]
  pub async fn fetch_ticker(&self, pair: &str) -> Result<TickerRecord, ExchangeError> {
    let client = self.connect().await?;
    client.ticker(pair).await
  }

  /// The current snapshot.
  pub fn snapshot(&self) -> Arc<Snapshot> {
    Arc::clone(&self.snapshot_tx.borrow())
  }

  /// A reader that always sees the latest complete snapshot.
  pub fn subscribe(&self) -> SnapshotReader {
    self.snapshot_tx.subscribe()
  }

  /// Balance of `asset` in the current snapshot.
  pub fn get_balance(&self, asset: &str) -> Option<BalanceRecord> {
    self.snapshot_tx.borrow().balance(asset).cloned()
  }

  /// Ticker of `pair` in the current snapshot.
  pub fn get_ticker(&self, pair: &str) -> Option<TickerRecord> {
    self.snapshot_tx.borrow().ticker(pair).cloned()
  }

  /// Time left before `refresh` would reach the exchange again.
  pub fn throttle_remaining(&self) -> Duration {
    self.throttle.remaining()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;

  struct Unreachable;

  #[async_trait]
  impl ExchangeConnector for Unreachable {
    async fn connect(
      &self,
      credentials: &Credentials,
    ) -> Result<Arc<dyn ExchangeClient>, ExchangeError> {
      Err(ExchangeError::Connection {
        host: credentials.host(),
        message: "connection refused".to_string(),
      })
    }
  }

  fn adapter() -> PollingAdapter {
    PollingAdapter::new(
      "Binance",
      Credentials::new("key", "secret", "us"),
      Arc::new(Unreachable),
      Duration::from_secs(60),
    )
  }

  #[tokio::test(start_paused = true)]
  async fn test_starts_with_empty_snapshot() {
    let adapter = adapter();
    assert!(!adapter.snapshot().is_populated());
    assert!(adapter.get_balance("BTC").is_none());
    assert!(adapter.get_ticker("BTCUSDT").is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn test_connection_failure_is_not_fatal() {
    let adapter = adapter();
    let before = adapter.snapshot();

    assert!(matches!(
      adapter.refresh().await,
      RefreshOutcome::Failed(ExchangeError::Connection { .. })
    ));
    assert!(Arc::ptr_eq(&before, &adapter.snapshot()));

    // Same window: dropped without another connection attempt.
    assert!(matches!(adapter.refresh().await, RefreshOutcome::Throttled));
  }
}
