//! Market Gateway Port - Venue Access Interface
//!
//! Stateless façade over the trading venue: ticker, open orders,
//! trade history, limit placement, cancellation and tick size.
//!
//! Key design decisions:
//! - One remote call per method, no retries, no caching
//! - Failures are tagged (`GatewayError`) so the controller can
//!   branch on kind instead of string-matching
//! - Resilience lives entirely in the caller

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::pricing::TickSize;
use crate::domain::trade::{Fill, Order, TradeSide, TradingPair};

/// Why a gateway call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
  /// Transient network or venue failure.
  #[error("venue unavailable: {0}")]
  Unavailable(String),
  /// Placement violated a venue constraint (tick, balance, min notional).
  #[error("order rejected: {0}")]
  Rejected(String),
  /// Cancel targeted an order the venue no longer has.
  #[error("order not found: {0}")]
  NotFound(String),
  /// The venue does not list the pair.
  #[error("unknown trading pair: {0}")]
  UnknownPair(String),
}

impl GatewayError {
  /// Short label for logs and metrics.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Unavailable(_) => "unavailable",
      Self::Rejected(_) => "rejected",
      Self::NotFound(_) => "not_found",
      Self::UnknownPair(_) => "unknown_pair",
    }
  }
}

/// Result alias for gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Trait for venue access providers.
///
/// Implementors hold no trading state; they may be shared across
/// tasks behind an `Arc`. Each method is a single request/response.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketGateway: Send + Sync + 'static {
  /// Last traded price of the pair.
  async fn current_price(&self, pair: &TradingPair) -> GatewayResult<Decimal>;

  /// All orders currently resting on the book for this account and pair.
  async fn open_orders(&self, pair: &TradingPair) -> GatewayResult<Vec<Order>>;

  /// Most recent account executions, newest last, at most `limit`.
  async fn recent_fills(&self, pair: &TradingPair, limit: u16) -> GatewayResult<Vec<Fill>>;

  /// Submit a GTC limit order.
  ///
  /// # Errors
  /// `Rejected` if the venue refuses the order, `Unavailable` on
  /// transport failure.
  async fn place_limit_order(
    &self,
    pair: &TradingPair,
    side: TradeSide,
    amount: Decimal,
    price: Decimal,
  ) -> GatewayResult<Order>;

  /// Cancel one order by venue id.
  ///
  /// # Errors
  /// `NotFound` if the order is already closed on the venue.
  async fn cancel_order(&self, pair: &TradingPair, order_id: &str) -> GatewayResult<()>;

  /// Minimum price increment of the pair.
  ///
  /// # Errors
  /// `UnknownPair` if the venue does not list it.
  async fn tick_size(&self, pair: &TradingPair) -> GatewayResult<TickSize>;
}
