//! Symbol helpers: normalization, quote-asset units, icons, slugs.
//!
//! Asset and pair symbols are compared uppercase everywhere, so filter
//! lists like `["btc"]` match the exchange's `BTC`.

use rust_decimal::Decimal;

/// Quote assets recognised when deciding an exchange entity's unit.
/// Four-letter suffixes are checked first: `BTCUSDT` is quoted in `USDT`.
const QUOTE_ASSETS_LONG: [&str; 3] = ["USDT", "BUSD", "USDC"];
const QUOTE_ASSETS_SHORT: [&str; 2] = ["USD", "BTC"];

/// Icon used when the currency has no dedicated one.
pub const DEFAULT_COIN_ICON: &str = "mdi:currency-usd-circle";

/// Canonical form of an asset or pair symbol.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Normalize a list of filter symbols, dropping blanks and duplicates
/// while keeping the configured order.
pub fn normalize_filters(filters: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(filters.len());
    for symbol in filters.iter().map(|s| normalize_symbol(s)) {
        if !symbol.is_empty() && !out.contains(&symbol) {
            out.push(symbol);
        }
    }
    out
}

/// Quote asset of a trading pair, used as the exchange entity's unit.
pub fn quote_unit(pair: &str) -> Option<&'static str> {
    let pair = normalize_symbol(pair);
    QUOTE_ASSETS_LONG
        .iter()
        .find(|quote| pair.len() > quote.len() && pair.ends_with(*quote))
        .or_else(|| {
            QUOTE_ASSETS_SHORT
                .iter()
                .find(|quote| pair.len() > quote.len() && pair.ends_with(*quote))
        })
        .copied()
}

/// Material Design icon for a currency symbol.
pub fn currency_icon(currency: Option<&str>) -> &'static str {
    match currency {
        Some("BTC") => "mdi:currency-btc",
        Some("ETH") => "mdi:currency-eth",
        Some("EUR") => "mdi:currency-eur",
        Some("LTC") => "mdi:litecoin",
        Some("USD") => "mdi:currency-usd",
        _ => DEFAULT_COIN_ICON,
    }
}

/// Lowercase, underscore-separated identifier fragment.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

/// Render an amount without trailing zeros but with at least one
/// fractional digit: `1.50000000` -> `1.5`, `75000` -> `75000.0`.
pub fn format_amount(amount: Decimal) -> String {
    let text = amount.normalize().to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}
