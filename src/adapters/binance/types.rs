//! Binance REST Wire Types
//!
//! Response bodies of the endpoints the client calls. Amounts arrive
//! as decimal strings and are parsed straight into `Decimal`.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{BalanceRecord, TickerRecord};

/// `GET /api/v3/time`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerTime {
    /// Exchange clock, Unix ms.
    #[serde(rename = "serverTime")]
    pub server_time: i64,
}

/// `GET /api/v3/account`; only the fields this service reads.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    /// One entry per asset, including zero balances.
    pub balances: Vec<AssetBalance>,
}

/// One element of `AccountInfo::balances`.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

impl From<AssetBalance> for BalanceRecord {
    fn from(b: AssetBalance) -> Self {
        Self::new(&b.asset, b.free, b.locked)
    }
}

/// `GET /api/v3/ticker/price` element (or whole body with `symbol=`).
#[derive(Debug, Clone, Deserialize)]
pub struct PriceTicker {
    pub symbol: String,
    pub price: Decimal,
}

impl From<PriceTicker> for TickerRecord {
    fn from(t: PriceTicker) -> Self {
        Self::new(&t.symbol, t.price)
    }
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}
