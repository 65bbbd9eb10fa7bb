//! Venue REST Request/Response Types
//!
//! Wire shapes for the Binance-compatible spot REST API. Prices and
//! quantities arrive as JSON strings and are decoded straight into
//! `Decimal`; conversion to domain types happens here so the gateway
//! only deals with `Order` and `Fill`.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::trade::{Fill, Order, TradeSide};

/// `GET /api/v3/ticker/price` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPrice {
  /// Venue symbol, e.g. "BTCUSDT".
  pub symbol: String,
  /// Last traded price.
  pub price: Decimal,
}

/// One element of `GET /api/v3/openOrders`, also the shape returned
/// by `POST /api/v3/order` with `newOrderRespType=RESULT`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
  pub symbol: String,
  /// Numeric venue order id.
  pub order_id: u64,
  #[serde(default)]
  pub client_order_id: Option<String>,
  pub price: Decimal,
  pub orig_qty: Decimal,
  #[serde(default)]
  pub status: Option<String>,
  /// "BUY" or "SELL".
  pub side: String,
  /// Creation time in ms (open orders).
  #[serde(default)]
  pub time: Option<i64>,
  /// Creation time in ms (new order response).
  #[serde(default)]
  pub transact_time: Option<i64>,
}

impl OrderResponse {
  /// Convert to a domain order. `fallback` stamps orders whose
  /// response carries no creation time.
  pub fn into_order(self, fallback: DateTime<Utc>) -> Option<Order> {
    let side = parse_side(&self.side)?;
    let placed_at = self
      .time
      .or(self.transact_time)
      .and_then(millis_to_utc)
      .unwrap_or(fallback);
    Some(Order {
      id: self.order_id.to_string(),
      side,
      price: self.price,
      amount: self.orig_qty,
      placed_at,
    })
  }
}

/// One element of `GET /api/v3/myTrades`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeResponse {
  pub symbol: String,
  /// Venue trade id.
  pub id: u64,
  /// Order the trade executed against.
  pub order_id: u64,
  pub price: Decimal,
  pub qty: Decimal,
  /// Execution time in ms.
  pub time: i64,
  /// True when this account was the buyer.
  pub is_buyer: bool,
}

impl TradeResponse {
  pub fn into_fill(self) -> Option<Fill> {
    Some(Fill {
      trade_id: self.id.to_string(),
      order_id: self.order_id.to_string(),
      side: if self.is_buyer {
        TradeSide::Buy
      } else {
        TradeSide::Sell
      },
      price: self.price,
      amount: self.qty,
      timestamp: millis_to_utc(self.time)?,
    })
  }
}

/// `GET /api/v3/exchangeInfo` response, reduced to what the ladder needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfo {
  #[serde(default)]
  pub symbols: Vec<SymbolInfo>,
}

/// Per-symbol trading rules.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolInfo {
  pub symbol: String,
  #[serde(default)]
  pub filters: Vec<SymbolFilter>,
}

/// Symbol filter, tagged by `filterType`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
  #[serde(rename = "PRICE_FILTER", rename_all = "camelCase")]
  Price { tick_size: Decimal },
  #[serde(other)]
  Other,
}

impl ExchangeInfo {
  /// Tick size of `symbol`, if the venue lists it with a price filter.
  pub fn tick_size(&self, symbol: &str) -> Option<Decimal> {
    self
      .symbols
      .iter()
      .find(|s| s.symbol == symbol)?
      .filters
      .iter()
      .find_map(|f| match f {
        SymbolFilter::Price { tick_size } => Some(*tick_size),
        SymbolFilter::Other => None,
      })
  }
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
  /// Venue error code (negative).
  pub code: i64,
  pub msg: String,
}

fn parse_side(raw: &str) -> Option<TradeSide> {
  match raw {
    "BUY" => Some(TradeSide::Buy),
    "SELL" => Some(TradeSide::Sell),
    _ => None,
  }
}

fn millis_to_utc(ms: i64) -> Option<DateTime<Utc>> {
  Utc.timestamp_millis_opt(ms).single()
}
