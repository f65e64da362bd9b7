//! Display entities: read-only projections of the snapshot.
//!
//! One entity per exposed asset balance and one per exposed trading
//! pair. Entities carry only static configuration (symbol, native
//! currency, account name) and re-derive everything else from the
//! snapshot they are refreshed with.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::market::{BalanceRecord, Snapshot, TickerRecord};
use super::symbols::{currency_icon, format_amount, normalize_symbol, quote_unit, slugify};

/// Attribution attached to every entity.
pub const ATTRIBUTION: &str = "Data provided by Binance";

/// Decimal places of the native-currency equivalent.
const NATIVE_DECIMALS: u32 = 2;

/// What an entity observes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorKind {
    /// Balance of one asset, with conversion into the native currency.
    Balance {
        asset: String,
        native_currency: String,
    },
    /// Last price of one trading pair.
    Exchange { symbol: String },
}

/// Entity category as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Balance,
    Exchange,
}

/// Extra attributes reported alongside the state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityAttributes {
    pub attribution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<String>,
    /// Omitted on exchange entities; `Some(None)` (serialized as `null`)
    /// on balance entities whose conversion pair is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_balance: Option<Option<String>>,
}

/// Rendered state of an entity, as handed to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub entity_id: String,
    pub name: String,
    pub account: String,
    pub kind: EntityKind,
    /// Observed asset or pair symbol.
    pub symbol: String,
    pub state: Option<String>,
    pub unit_of_measurement: Option<String>,
    pub icon: String,
    pub attributes: EntityAttributes,
    pub last_updated: Option<DateTime<Utc>>,
    /// Numeric state, for metrics.
    #[serde(skip)]
    pub value: Option<f64>,
    /// Numeric native-currency equivalent, for metrics.
    #[serde(skip)]
    pub native_value: Option<f64>,
}

/// A single sensor bound to one asset or one pair.
#[derive(Debug, Clone)]
pub struct DisplayEntity {
    entity_id: String,
    name: String,
    account: String,
    kind: SensorKind,
    unit: Option<String>,
    icon: &'static str,
    state: Option<Decimal>,
    free: Option<Decimal>,
    locked: Option<Decimal>,
    native_balance: Option<Decimal>,
    last_updated: Option<DateTime<Utc>>,
}

impl DisplayEntity {
    /// Balance entity for `asset`, converted into `native_currency`.
    pub fn balance(account: &str, asset: &str, native_currency: &str) -> Self {
        let asset = normalize_symbol(asset);
        let name = format!("{account} {asset} Balance");
        Self {
            entity_id: format!("sensor.{}", slugify(&name)),
            name,
            account: account.to_string(),
            unit: Some(asset.clone()),
            icon: currency_icon(Some(asset.as_str())),
            kind: SensorKind::Balance {
                asset,
                native_currency: normalize_symbol(native_currency),
            },
            state: None,
            free: None,
            locked: None,
            native_balance: None,
            last_updated: None,
        }
    }

    /// Exchange-rate entity for the trading pair `symbol`.
    pub fn exchange(account: &str, symbol: &str) -> Self {
        let symbol = normalize_symbol(symbol);
        let name = format!("{account} {symbol} Exchange");
        let unit = quote_unit(&symbol);
        Self {
            entity_id: format!("sensor.{}", slugify(&name)),
            name,
            account: account.to_string(),
            unit: unit.map(str::to_string),
            icon: currency_icon(unit),
            kind: SensorKind::Exchange { symbol },
            state: None,
            free: None,
            locked: None,
            native_balance: None,
            last_updated: None,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &SensorKind {
        &self.kind
    }

    pub fn state(&self) -> Option<Decimal> {
        self.state
    }

    pub fn native_balance(&self) -> Option<Decimal> {
        self.native_balance
    }

    /// Re-read this entity's record from `snapshot`.
    ///
    /// Returns `false` and keeps the previous values when the record is
    /// absent from the snapshot.
    pub fn refresh(&mut self, snapshot: &Snapshot) -> bool {
        match &self.kind {
            SensorKind::Balance {
                asset,
                native_currency,
            } => {
                let Some(balance) = snapshot.balance(asset) else {
                    return false;
                };
                self.native_balance = native_value(balance, native_currency, snapshot);
                self.state = Some(balance.free);
                self.free = Some(balance.free);
                self.locked = Some(balance.locked);
            }
            SensorKind::Exchange { symbol } => {
                let Some(ticker) = snapshot.ticker(symbol) else {
                    return false;
                };
                self.state = Some(ticker.price);
            }
        }
        self.last_updated = snapshot.fetched_at();
        true
    }

    /// Render the current values for the host.
    pub fn render(&self) -> EntityState {
        let (kind, symbol, attributes) = match &self.kind {
            SensorKind::Balance {
                asset,
                native_currency,
            } => (
                EntityKind::Balance,
                asset.clone(),
                EntityAttributes {
                    attribution: ATTRIBUTION.to_string(),
                    free: self.free.map(|v| format!("{} {asset}", format_amount(v))),
                    locked: self.locked.map(|v| format!("{} {asset}", format_amount(v))),
                    native_balance: Some(
                        self.native_balance
                            .map(|v| format!("{} {native_currency}", format_amount(v))),
                    ),
                },
            ),
            SensorKind::Exchange { symbol } => (
                EntityKind::Exchange,
                symbol.clone(),
                EntityAttributes {
                    attribution: ATTRIBUTION.to_string(),
                    free: None,
                    locked: None,
                    native_balance: None,
                },
            ),
        };

        EntityState {
            entity_id: self.entity_id.clone(),
            name: self.name.clone(),
            account: self.account.clone(),
            kind,
            symbol,
            state: self.state.map(format_amount),
            unit_of_measurement: self.unit.clone(),
            icon: self.icon.to_string(),
            attributes,
            last_updated: self.last_updated,
            value: self.state.and_then(to_f64),
            native_value: self.native_balance.and_then(to_f64),
        }
    }
}

/// Value of a balance in the native currency, rounded to two decimals.
///
/// An asset that is itself the native currency converts 1:1. Otherwise
/// the `<ASSET><NATIVE>` pair must be present in the snapshot; when it is
/// not, the result is `None`.
pub fn native_value(
    balance: &BalanceRecord,
    native_currency: &str,
    snapshot: &Snapshot,
) -> Option<Decimal> {
    let native_currency = normalize_symbol(native_currency);
    let raw = if balance.asset == native_currency {
        balance.free
    } else {
        let pair = format!("{}{native_currency}", balance.asset);
        let ticker: &TickerRecord = snapshot.ticker(&pair)?;
        ticker.price.checked_mul(balance.free)?
    };
    Some(raw.round_dp_with_strategy(NATIVE_DECIMALS, RoundingStrategy::MidpointNearestEven))
}

fn to_f64(value: Decimal) -> Option<f64> {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot(balances: Vec<BalanceRecord>, tickers: Vec<TickerRecord>) -> Snapshot {
        Snapshot::new(balances, tickers, 1, Utc::now())
    }

    #[test]
    fn test_btc_balance_in_usd() {
        let snap = snapshot(
            vec![BalanceRecord::new("BTC", dec!(1.5), dec!(0.0))],
            vec![TickerRecord::new("BTCUSD", dec!(50000))],
        );
        let mut entity = DisplayEntity::balance("Binance", "BTC", "USD");
        assert!(entity.refresh(&snap));

        let rendered = entity.render();
        assert_eq!(rendered.entity_id, "sensor.binance_btc_balance");
        assert_eq!(rendered.name, "Binance BTC Balance");
        assert_eq!(rendered.state.as_deref(), Some("1.5"));
        assert_eq!(rendered.unit_of_measurement.as_deref(), Some("BTC"));
        assert_eq!(rendered.icon, "mdi:currency-btc");
        assert_eq!(rendered.attributes.free.as_deref(), Some("1.5 BTC"));
        assert_eq!(rendered.attributes.locked.as_deref(), Some("0.0 BTC"));
        assert_eq!(
            rendered.attributes.native_balance,
            Some(Some("75000.0 USD".to_string()))
        );
        assert_eq!(rendered.value, Some(1.5));
        assert_eq!(rendered.native_value, Some(75000.0));
    }

    #[test]
    fn test_native_asset_rounds_free_balance() {
        let snap = snapshot(vec![BalanceRecord::new("USD", dec!(12.3456), dec!(1))], Vec::new());
        let mut entity = DisplayEntity::balance("Binance", "USD", "USD");
        entity.refresh(&snap);
        assert_eq!(entity.native_balance(), Some(dec!(12.35)));
    }

    #[test]
    fn test_missing_conversion_pair_leaves_native_unset() {
        let snap = snapshot(vec![BalanceRecord::new("DOGE", dec!(100), dec!(0))], Vec::new());
        let mut entity = DisplayEntity::balance("Binance", "DOGE", "USD");
        assert!(entity.refresh(&snap));
        assert_eq!(entity.state(), Some(dec!(100)));
        assert_eq!(entity.native_balance(), None);
        assert_eq!(
            entity.render().attributes.native_balance,
            Some(None)
        );
    }

    #[test]
    fn test_conversion_pair_disappearing_clears_native_value() {
        let mut entity = DisplayEntity::balance("Binance", "ETH", "USD");
        entity.refresh(&snapshot(
            vec![BalanceRecord::new("ETH", dec!(2), dec!(0))],
            vec![TickerRecord::new("ETHUSD", dec!(3000))],
        ));
        assert_eq!(entity.native_balance(), Some(dec!(6000)));

        entity.refresh(&snapshot(vec![BalanceRecord::new("ETH", dec!(2), dec!(0))], Vec::new()));
        assert_eq!(entity.native_balance(), None);
    }

    #[test]
    fn test_missing_record_keeps_previous_values() {
        let mut entity = DisplayEntity::exchange("Binance", "BTCUSDT");
        entity.refresh(&snapshot(Vec::new(), vec![TickerRecord::new("BTCUSDT", dec!(42000.5))]));
        assert!(!entity.refresh(&snapshot(Vec::new(), Vec::new())));
        assert_eq!(entity.state(), Some(dec!(42000.5)));
    }

    #[test]
    fn test_exchange_entity_presentation() {
        let mut entity = DisplayEntity::exchange("Binance", "ethbtc");
        entity.refresh(&snapshot(Vec::new(), vec![TickerRecord::new("ETHBTC", dec!(0.05120000))]));
        let rendered = entity.render();
        assert_eq!(rendered.entity_id, "sensor.binance_ethbtc_exchange");
        assert_eq!(rendered.name, "Binance ETHBTC Exchange");
        assert_eq!(rendered.state.as_deref(), Some("0.0512"));
        assert_eq!(rendered.unit_of_measurement.as_deref(), Some("BTC"));
        assert_eq!(rendered.icon, "mdi:currency-btc");
        assert_eq!(rendered.kind, EntityKind::Exchange);
    }

    #[test]
    fn test_exchange_attributes_serialize_without_balance_fields() {
        let entity = DisplayEntity::exchange("Binance", "BTCUSDT");
        let json = serde_json::to_value(entity.render()).unwrap();
        let attrs = json["attributes"].as_object().unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs["attribution"], ATTRIBUTION);
    }

    #[test]
    fn test_balance_attributes_serialize_null_native() {
        let mut entity = DisplayEntity::balance("Binance", "DOGE", "USD");
        entity.refresh(&snapshot(vec![BalanceRecord::new("DOGE", dec!(1), dec!(0))], Vec::new()));
        let json = serde_json::to_value(entity.render()).unwrap();
        let attrs = json["attributes"].as_object().unwrap();
        assert!(attrs.contains_key("native_balance"));
        assert!(attrs["native_balance"].is_null());
        assert_eq!(json["attributes"]["free"], "1.0 DOGE");
        assert_eq!(json["kind"], "balance");
    }
}
