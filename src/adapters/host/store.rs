//! Entity Store - In-memory Entity Host
//!
//! Implements the `EntityHost` port by keeping the latest state of
//! every entity, keyed by entity id, and mirroring numeric values
//! into Prometheus. The HTTP server reads from here.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::EntityState;
use crate::ports::host::{EntityHost, PollStatus};

/// Latest rendered entities of all accounts.
pub struct EntityStore {
    entities: RwLock<BTreeMap<String, EntityState>>,
    /// Accounts that have registered their entity set.
    registered: RwLock<BTreeSet<String>>,
    /// Number of configured accounts; readiness needs all of them.
    expected_accounts: usize,
    metrics: Arc<MetricsRegistry>,
}

impl EntityStore {
    pub fn new(expected_accounts: usize, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            entities: RwLock::new(BTreeMap::new()),
            registered: RwLock::new(BTreeSet::new()),
            expected_accounts,
            metrics,
        }
    }

    /// All entities, ordered by entity id.
    pub fn list(&self) -> Vec<EntityState> {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn get(&self, entity_id: &str) -> Option<EntityState> {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity_id)
            .cloned()
    }

    /// True once every configured account has registered.
    pub fn is_ready(&self) -> bool {
        self.registered
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
            >= self.expected_accounts
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    fn upsert(&self, entities: Vec<EntityState>) {
        let mut map = self.entities.write().unwrap_or_else(PoisonError::into_inner);
        for entity in entities {
            self.metrics.observe_entity(&entity);
            map.insert(entity.entity_id.clone(), entity);
        }
    }
}

impl EntityHost for EntityStore {
    fn register(&self, account: &str, entities: Vec<EntityState>) {
        #[allow(clippy::cast_precision_loss)]
        let count = entities.len() as f64;
        for entity in &entities {
            debug!(account, entity_id = %entity.entity_id, "Registering entity");
        }
        self.upsert(entities);
        self.metrics.entities.with_label_values(&[account]).set(count);
        self.registered
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(account.to_string());
        info!(account, entities = count, "Entities registered");
    }

    fn update(&self, account: &str, entities: Vec<EntityState>) {
        debug!(account, entities = entities.len(), "Entities updated");
        self.upsert(entities);
    }

    fn record_poll(&self, account: &str, status: PollStatus) {
        self.metrics.observe_poll(account, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DisplayEntity, Snapshot, TickerRecord};
    use rust_decimal_macros::dec;

    fn store(expected: usize) -> EntityStore {
        EntityStore::new(expected, Arc::new(MetricsRegistry::new().unwrap()))
    }

    fn ticker_entity(price: rust_decimal::Decimal) -> EntityState {
        let snapshot = Snapshot::new(
            Vec::new(),
            vec![TickerRecord::new("BTCUSDT", price)],
            1,
            chrono::Utc::now(),
        );
        let mut entity = DisplayEntity::exchange("Binance", "BTCUSDT");
        entity.refresh(&snapshot);
        entity.render()
    }

    #[test]
    fn test_ready_after_all_accounts_register() {
        let store = store(2);
        assert!(!store.is_ready());
        store.register("A", Vec::new());
        assert!(!store.is_ready());
        store.register("B", Vec::new());
        assert!(store.is_ready());
    }

    #[test]
    fn test_update_replaces_entity_state() {
        let store = store(1);
        store.register("Binance", vec![ticker_entity(dec!(100))]);
        store.update("Binance", vec![ticker_entity(dec!(200))]);

        let entities = store.list();
        assert_eq!(entities.len(), 1);
        let entity = store.get("sensor.binance_btcusdt_exchange").unwrap();
        assert_eq!(entity.state.as_deref(), Some("200.0"));
    }

    #[test]
    fn test_unknown_entity() {
        assert!(store(1).get("sensor.nope").is_none());
    }
}
