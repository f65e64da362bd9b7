//! Prometheus Metrics Registry - Sensor Observability
//!
//! Mirrors every entity's numeric state into gauges and counts poll
//! outcomes per account. Exposed as text on the host server's
//! `/metrics` route.

use prometheus::{Encoder, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::warn;

use crate::domain::EntityState;
use crate::ports::host::PollStatus;

/// Centralized Prometheus metrics for the service.
///
/// All metrics follow the naming convention `binance_sensors_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Entity state (balance free amount or pair price).
    pub entity_value: GaugeVec,
    /// Native-currency equivalent of balance entities.
    pub entity_native_value: GaugeVec,
    /// Poll attempts by outcome.
    pub polls: IntCounterVec,
    /// Unix time of the last successful poll.
    pub last_update: GaugeVec,
    /// Registered entities per account.
    pub entities: GaugeVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let entity_value = GaugeVec::new(
            Opts::new(
                "binance_sensors_entity_value",
                "Entity state: free balance or last price",
            ),
            &["account", "entity_id", "kind", "symbol"],
        )?;

        let entity_native_value = GaugeVec::new(
            Opts::new(
                "binance_sensors_entity_native_value",
                "Balance converted into the account's native currency",
            ),
            &["account", "entity_id", "symbol"],
        )?;

        let polls = IntCounterVec::new(
            Opts::new("binance_sensors_polls_total", "Poll attempts by outcome"),
            &["account", "status"],
        )?;

        let last_update = GaugeVec::new(
            Opts::new(
                "binance_sensors_last_update_timestamp_seconds",
                "Unix time of the last successful poll",
            ),
            &["account"],
        )?;

        let entities = GaugeVec::new(
            Opts::new("binance_sensors_entities", "Registered entities"),
            &["account"],
        )?;

        // Register all metrics
        registry.register(Box::new(entity_value.clone()))?;
        registry.register(Box::new(entity_native_value.clone()))?;
        registry.register(Box::new(polls.clone()))?;
        registry.register(Box::new(last_update.clone()))?;
        registry.register(Box::new(entities.clone()))?;

        Ok(Self {
            registry,
            entity_value,
            entity_native_value,
            polls,
            last_update,
            entities,
        })
    }

    /// Mirror an entity's numeric values into the gauges.
    pub fn observe_entity(&self, entity: &EntityState) {
        let kind = match entity.kind {
            crate::domain::EntityKind::Balance => "balance",
            crate::domain::EntityKind::Exchange => "exchange",
        };
        if let Some(value) = entity.value {
            self.entity_value
                .with_label_values(&[
                    entity.account.as_str(),
                    entity.entity_id.as_str(),
                    kind,
                    entity.symbol.as_str(),
                ])
                .set(value);
        }

        let native_labels = [
            entity.account.as_str(),
            entity.entity_id.as_str(),
            entity.symbol.as_str(),
        ];
        match entity.native_value {
            Some(native) => self
                .entity_native_value
                .with_label_values(&native_labels)
                .set(native),
            None => {
                // Stale conversions must not linger after the pair vanishes.
                let _ = self.entity_native_value.remove_label_values(&native_labels);
            }
        }
    }

    /// Count a poll attempt.
    pub fn observe_poll(&self, account: &str, status: PollStatus) {
        self.polls
            .with_label_values(&[account, status.as_str()])
            .inc();
        if status == PollStatus::Updated {
            #[allow(clippy::cast_precision_loss)]
            let now = chrono::Utc::now().timestamp() as f64;
            self.last_update.with_label_values(&[account]).set(now);
        }
    }

    /// Render all metrics in the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
