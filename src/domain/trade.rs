//! Core trading domain types.
//!
//! Defines the entities the ladder works with: the traded pair, order
//! sides, venue orders and buy/sell fills. Prices and amounts are
//! `Decimal` throughout so tick arithmetic stays exact.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────
// Type aliases consumed by ports and adapters
// ────────────────────────────────────────────

/// Opaque venue-assigned order identifier.
pub type OrderId = String;

// ────────────────────────────────────────────
// Trading pair
// ────────────────────────────────────────────

/// Error returned when a pair string is not of the form `BASE/QUOTE`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid trading pair {0:?}: expected BASE/QUOTE, e.g. BTC/USDT")]
pub struct PairParseError(pub String);

/// Immutable identifier of the single market the ladder trades.
///
/// Parsed from `BASE/QUOTE` and normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TradingPair {
    base: String,
    quote: String,
}

impl TradingPair {
    /// Build a pair from its two asset symbols.
    pub fn new(base: &str, quote: &str) -> Result<Self, PairParseError> {
        let base = base.trim().to_uppercase();
        let quote = quote.trim().to_uppercase();
        let valid = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid(&base) || !valid(&quote) {
            return Err(PairParseError(format!("{base}/{quote}")));
        }
        Ok(Self { base, quote })
    }

    /// Base asset, e.g. `BTC`.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Quote asset, e.g. `USDT`.
    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Concatenated venue symbol, e.g. `BTCUSDT`.
    pub fn symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl FromStr for TradingPair {
    type Err = PairParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((base, quote)) if !quote.contains('/') => Self::new(base, quote),
            _ => Err(PairParseError(s.to_string())),
        }
    }
}

impl TryFrom<String> for TradingPair {
    type Error = PairParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TradingPair> for String {
    fn from(pair: TradingPair) -> Self {
        pair.to_string()
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

// ────────────────────────────────────────────
// Orders and fills
// ────────────────────────────────────────────

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// A limit order as reported by the venue.
///
/// Created only by a successful placement. The controller never
/// changes price or amount afterwards; re-pricing is cancel + place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Venue-assigned order ID.
    pub id: OrderId,
    /// Buy or sell.
    pub side: TradeSide,
    /// Limit price.
    pub price: Decimal,
    /// Order quantity in base units.
    pub amount: Decimal,
    /// When the venue accepted the order.
    pub placed_at: DateTime<Utc>,
}

impl Order {
    /// Time elapsed since placement, as seen at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now.signed_duration_since(self.placed_at)
    }

    /// Whether this order has been resting for strictly longer than `max_age`.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: TimeDelta) -> bool {
        self.age(now) > max_age
    }
}

/// One execution from the account's trade history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// Venue trade ID.
    pub trade_id: String,
    /// Order that was (partially) filled.
    pub order_id: OrderId,
    /// Side of our order in this execution.
    pub side: TradeSide,
    /// Execution price.
    pub price: Decimal,
    /// Executed quantity.
    pub amount: Decimal,
    /// Execution time.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order_placed_at(placed_at: DateTime<Utc>) -> Order {
        Order {
            id: "1".to_string(),
            side: TradeSide::Buy,
            price: dec!(49.0),
            amount: dec!(1),
            placed_at,
        }
    }

    #[test]
    fn test_pair_parse_normalizes_case() {
        let pair: TradingPair = " btc/usdt ".trim().parse().unwrap();
        assert_eq!(pair.base(), "BTC");
        assert_eq!(pair.quote(), "USDT");
        assert_eq!(pair.symbol(), "BTCUSDT");
        assert_eq!(pair.to_string(), "BTC/USDT");
    }

    #[test]
    fn test_pair_parse_rejects_malformed() {
        assert!("BTCUSDT".parse::<TradingPair>().is_err());
        assert!("BTC/".parse::<TradingPair>().is_err());
        assert!("/USDT".parse::<TradingPair>().is_err());
        assert!("BTC/USDT/EUR".parse::<TradingPair>().is_err());
        assert!("BTC/US DT".parse::<TradingPair>().is_err());
    }

    #[test]
    fn test_pair_serde_roundtrip_through_string() {
        let pair: TradingPair = serde_json::from_str("\"eth/btc\"").unwrap();
        assert_eq!(pair.symbol(), "ETHBTC");
        assert_eq!(serde_json::to_string(&pair).unwrap(), "\"ETH/BTC\"");
    }

    #[test]
    fn test_order_stale_is_strictly_greater() {
        let now = Utc::now();
        let max_age = TimeDelta::seconds(180);

        let at_threshold = order_placed_at(now - max_age);
        assert!(!at_threshold.is_stale(now, max_age));

        let past_threshold = order_placed_at(now - max_age - TimeDelta::milliseconds(1));
        assert!(past_threshold.is_stale(now, max_age));
    }

    #[test]
    fn test_trade_side_display() {
        assert_eq!(format!("{}", TradeSide::Buy), "BUY");
        assert_eq!(format!("{}", TradeSide::Sell), "SELL");
    }
}
