//! Market data domain types.
//!
//! Balance and ticker records as fetched from the exchange, and the
//! `Snapshot` that groups one poll's worth of them. A snapshot is
//! immutable once built: refreshes replace it, they never patch it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::symbols::normalize_symbol;

/// Balance of a single asset in the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRecord {
    /// Asset symbol, uppercase (e.g., "BTC").
    pub asset: String,
    /// Amount available for trading.
    pub free: Decimal,
    /// Amount locked in open orders.
    pub locked: Decimal,
}

impl BalanceRecord {
    /// Create a record, normalizing the asset symbol.
    pub fn new(asset: &str, free: Decimal, locked: Decimal) -> Self {
        Self {
            asset: normalize_symbol(asset),
            free,
            locked,
        }
    }
}

/// Last traded price of a single trading pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerRecord {
    /// Trading pair symbol, uppercase (e.g., "BTCUSDT").
    pub symbol: String,
    /// Last price, quoted in the pair's quote asset.
    pub price: Decimal,
}

impl TickerRecord {
    /// Create a record, normalizing the pair symbol.
    pub fn new(symbol: &str, price: Decimal) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            price,
        }
    }
}

/// One complete poll result: every balance and every ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    balances: BTreeMap<String, BalanceRecord>,
    tickers: BTreeMap<String, TickerRecord>,
    /// Monotonic counter, 0 for the initial empty snapshot.
    generation: u64,
    /// When the data was fetched; `None` before the first poll.
    fetched_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// The placeholder snapshot that exists before any successful poll.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from freshly fetched records.
    ///
    /// Duplicate keys keep the last record seen.
    pub fn new(
        balances: Vec<BalanceRecord>,
        tickers: Vec<TickerRecord>,
        generation: u64,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            balances: balances
                .into_iter()
                .map(|b| (b.asset.clone(), b))
                .collect(),
            tickers: tickers
                .into_iter()
                .map(|t| (t.symbol.clone(), t))
                .collect(),
            generation,
            fetched_at: Some(fetched_at),
        }
    }

    /// Look up the balance of an asset (case-insensitive).
    pub fn balance(&self, asset: &str) -> Option<&BalanceRecord> {
        self.balances.get(&normalize_symbol(asset))
    }

    /// Look up the ticker of a trading pair (case-insensitive).
    pub fn ticker(&self, pair: &str) -> Option<&TickerRecord> {
        self.tickers.get(&normalize_symbol(pair))
    }

    /// All balances, ordered by asset symbol.
    pub fn balances(&self) -> impl Iterator<Item = &BalanceRecord> {
        self.balances.values()
    }

    /// All tickers, ordered by pair symbol.
    pub fn tickers(&self) -> impl Iterator<Item = &TickerRecord> {
        self.tickers.values()
    }

    pub fn balance_count(&self) -> usize {
        self.balances.len()
    }

    pub fn ticker_count(&self) -> usize {
        self.tickers.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    /// True once the snapshot holds data from a successful poll.
    pub fn is_populated(&self) -> bool {
        self.fetched_at.is_some()
    }
}
