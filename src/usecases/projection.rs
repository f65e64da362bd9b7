//! Entity Projection - Snapshot to Sensor Entities
//!
//! Decides which entities exist (from the filters and the first
//! available snapshot) and keeps them in step with the adapter's
//! snapshot afterwards.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::symbols::normalize_filters;
use crate::domain::{DisplayEntity, EntityState, Snapshot};
use crate::ports::exchange::ExchangeError;

use super::poller::{PollingAdapter, SnapshotReader};

/// Static configuration of an account's entity set.
#[derive(Debug, Clone)]
pub struct ProjectionConfig {
  /// Account display name, prefixed to entity names.
  pub account_name: String,
  /// Currency balances are converted into.
  pub native_currency: String,
  /// Assets to expose; empty means every asset in the first snapshot.
  pub balances: Vec<String>,
  /// Pairs to expose; empty means every pair in the first snapshot.
  pub exchanges: Vec<String>,
}

/// Build the entity set of an account from its first snapshot.
///
/// Configured assets missing from the snapshot are skipped. Configured
/// pairs missing from the snapshot are looked up once on the exchange
/// and skipped if it does not list them. Every returned entity has
/// already been refreshed from `snapshot`.
pub async fn project_entities(
  adapter: &PollingAdapter,
  config: &ProjectionConfig,
  snapshot: &Snapshot,
) -> Vec<DisplayEntity> {
  let mut entities = Vec::new();
  let account = config.account_name.as_str();

  let balance_filters = normalize_filters(&config.balances);
  if balance_filters.is_empty() {
    entities.extend(
      snapshot
        .balances()
        .map(|b| DisplayEntity::balance(account, &b.asset, &config.native_currency)),
    );
  } else {
    info!(account, balances = ?balance_filters, "Initializing balance sensors");
    for asset in &balance_filters {
      if snapshot.balance(asset).is_some() {
        entities.push(DisplayEntity::balance(account, asset, &config.native_currency));
      } else {
        warn!(account, asset = %asset, "Asset not in account balances, skipping");
      }
    }
  }

  let exchange_filters = normalize_filters(&config.exchanges);
  if exchange_filters.is_empty() {
    entities.extend(
      snapshot
        .tickers()
        .map(|t| DisplayEntity::exchange(account, &t.symbol)),
    );
  } else {
    info!(account, exchanges = ?exchange_filters, "Initializing exchange sensors");
    for pair in &exchange_filters {
      if snapshot.ticker(pair).is_some() {
        entities.push(DisplayEntity::exchange(account, pair));
        continue;
      }
      match adapter.fetch_ticker(pair).await {
        Ok(ticker) => {
          debug!(account, pair = %ticker.symbol, "Pair listed but not in snapshot yet");
          entities.push(DisplayEntity::exchange(account, &ticker.symbol));
        }
        Err(ExchangeError::UnknownSymbol { .. }) => {
          warn!(account, pair = %pair, "Pair not listed on exchange, skipping");
        }
        Err(e) => {
          warn!(account, pair = %pair, error = %e, "Cannot verify pair, skipping");
        }
      }
    }
  }

  for entity in &mut entities {
    entity.refresh(snapshot);
  }

  info!(account, entities = entities.len(), "Entities projected");
  entities
}

/// An account's entities, bound to its adapter's snapshot.
pub struct EntityRegistry {
  account: String,
  reader: SnapshotReader,
  entities: Vec<DisplayEntity>,
}

impl EntityRegistry {
  pub fn new(account: &str, reader: SnapshotReader, entities: Vec<DisplayEntity>) -> Self {
    Self {
      account: account.to_string(),
      reader,
      entities,
    }
  }

  pub fn account(&self) -> &str {
    &self.account
  }

  pub fn len(&self) -> usize {
    self.entities.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entities.is_empty()
  }

  pub fn get(&self, entity_id: &str) -> Option<&DisplayEntity> {
    self.entities.iter().find(|e| e.entity_id() == entity_id)
  }

  /// Re-read every entity from the latest snapshot.
  ///
  /// All entities see the same snapshot. Returns how many found their
  /// record in it.
  pub fn refresh_all(&mut self) -> usize {
    let snapshot: Arc<Snapshot> = Arc::clone(&self.reader.borrow_and_update());
    self
      .entities
      .iter_mut()
      .map(|entity| entity.refresh(&snapshot))
      .filter(|found| *found)
      .count()
  }

  /// Render every entity for the host.
  pub fn render_all(&self) -> Vec<EntityState> {
    self.entities.iter().map(DisplayEntity::render).collect()
  }
}
