//! Ladder Controller - Buy Ladder Lifecycle Management
//!
//! Owns all trading state and runs one reconciliation cycle at a time:
//! 1. Snapshot the market price (failure abandons the cycle)
//! 2. Cancel buys resting longer than the age limit and re-place them
//! 3. Turn every new buy fill into a paired sell at fill price + offset
//! 4. Add one buy if the ladder is below target depth
//!
//! Every gateway call is awaited in order; nothing here runs in parallel.
//! Per-order lifecycle: `Placed → Expired → Cancelled → Replaced` or
//! `Placed → Filled → Converted`. Sells are fire-and-forget.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::config::LadderConfig;
use crate::domain::books::{ExecutedBuys, TrackedBuys};
use crate::domain::pricing::{LadderPricing, TickRounding, TickSize};
use crate::domain::trade::{Order, TradeSide, TradingPair};
use crate::ports::gateway::{GatewayError, MarketGateway};

/// Static parameters of one ladder.
#[derive(Debug, Clone)]
pub struct LadderSettings {
  /// Traded pair.
  pub pair: TradingPair,
  /// Size of every order.
  pub order_amount: Decimal,
  /// Buy discount and sell premium.
  pub offset: Decimal,
  /// Concurrent buys to maintain.
  pub target_depth: usize,
  /// Buys strictly older than this are expired.
  pub max_order_age: TimeDelta,
  /// Trade-history window scanned per cycle.
  pub fill_history_limit: u16,
  /// Midpoint rounding mode.
  pub rounding: TickRounding,
}

impl From<&LadderConfig> for LadderSettings {
  fn from(config: &LadderConfig) -> Self {
    Self {
      pair: config.pair.clone(),
      order_amount: config.order_amount,
      offset: config.offset,
      target_depth: config.target_depth,
      max_order_age: config.max_order_age(),
      fill_history_limit: config.fill_history_limit,
      rounding: config.rounding,
    }
  }
}

/// Cycle-level failure. Only the price snapshot can abandon a cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CycleError {
  #[error("price snapshot failed: {0}")]
  Snapshot(#[source] GatewayError),
}

impl CycleError {
  pub fn gateway_error(&self) -> &GatewayError {
    match self {
      Self::Snapshot(e) => e,
    }
  }
}

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
  /// Market price the cycle worked from.
  pub price: Decimal,
  /// Stale buys successfully cancelled.
  pub cancelled: usize,
  /// Replacement buys placed after a cancel.
  pub replaced: usize,
  /// Cancels that failed (replacement skipped).
  pub cancel_failures: usize,
  /// New buy fills converted into sells.
  pub fills_converted: usize,
  /// Paired sells that failed to place (not retried).
  pub sell_failures: usize,
  /// Replenishment buys placed.
  pub buys_placed: usize,
  /// Buy placements (replacement or replenishment) that failed.
  pub buy_failures: usize,
  /// Steps skipped because their snapshot could not be fetched.
  pub skipped_steps: usize,
  /// Tracked buys after the cycle.
  pub tracked: usize,
  /// Buy orders in the executed set after the cycle.
  pub executed: usize,
}

/// Buy ladder controller.
///
/// Constructed once per process; owns `TrackedBuys` and `ExecutedBuys`
/// and is driven by `LadderRunner`. The gateway is shared and stateless.
pub struct LadderController<G: MarketGateway> {
  /// Venue access.
  gateway: Arc<G>,
  /// Ladder parameters.
  settings: LadderSettings,
  /// Tick-aligned pricing derived at startup.
  pricing: LadderPricing,
  /// Buys we placed and believe are live.
  tracked: TrackedBuys,
  /// Buy orders already converted into sells.
  executed: ExecutedBuys,
}

impl<G: MarketGateway> LadderController<G> {
  /// Fetch the tick size and build a controller.
  ///
  /// # Errors
  /// Any tick-size failure is returned as-is; the caller must not
  /// start the loop without a valid tick.
  #[instrument(skip(gateway, settings), fields(pair = %settings.pair))]
  pub async fn start(gateway: Arc<G>, settings: LadderSettings) -> Result<Self, GatewayError> {
    let tick = gateway.tick_size(&settings.pair).await?;
    info!(tick = %tick, "Tick size resolved");
    Ok(Self::new(gateway, settings, tick))
  }

  /// Build a controller with a known tick size.
  pub fn new(gateway: Arc<G>, settings: LadderSettings, tick: TickSize) -> Self {
    let pricing = LadderPricing::new(tick, settings.offset, settings.rounding);
    Self {
      gateway,
      settings,
      pricing,
      tracked: TrackedBuys::new(),
      executed: ExecutedBuys::new(),
    }
  }

  pub fn settings(&self) -> &LadderSettings {
    &self.settings
  }

  pub fn tick(&self) -> TickSize {
    self.pricing.tick()
  }

  pub fn tracked(&self) -> &TrackedBuys {
    &self.tracked
  }

  pub fn executed(&self) -> &ExecutedBuys {
    &self.executed
  }

  /// Run one full cycle as of `now`.
  ///
  /// # Errors
  /// `CycleError::Snapshot` if the price cannot be fetched; in that case
  /// no order is cancelled or placed.
  #[instrument(skip(self, now), fields(pair = %self.settings.pair))]
  pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleReport, CycleError> {
    let pair = &self.settings.pair;

    let price = self
      .gateway
      .current_price(pair)
      .await
      .map_err(CycleError::Snapshot)?;
    info!(price = %price, "Current price of {pair}: {price}");

    let mut report = CycleReport {
      price,
      ..CycleReport::default()
    };

    let open_orders = match self.gateway.open_orders(pair).await {
      Ok(orders) => Some(orders),
      Err(e) => {
        warn!(error = %e, kind = e.kind(), "Failed to fetch open orders, skipping expiry");
        report.skipped_steps += 1;
        None
      }
    };

    if let Some(open) = &open_orders {
      self.expire_stale(open, price, now, &mut report).await;
    }

    self.convert_fills(open_orders.as_deref(), &mut report).await;

    self.replenish(price, &mut report).await;

    report.tracked = self.tracked.len();
    report.executed = self.executed.len();
    debug!(?report, "Cycle complete");
    Ok(report)
  }

  /// Cancel buys older than the age limit and place a fresh one for each.
  ///
  /// A failed cancel leaves the order stale on the venue, so it is
  /// retried on the next cycle.
  async fn expire_stale(
    &mut self,
    open: &[Order],
    price: Decimal,
    now: DateTime<Utc>,
    report: &mut CycleReport,
  ) {
    let max_age = self.settings.max_order_age;
    let stale = open
      .iter()
      .filter(|o| o.side == TradeSide::Buy && o.is_stale(now, max_age));

    for order in stale {
      info!(
        order_id = %order.id,
        price = %order.price,
        age_secs = order.age(now).num_seconds(),
        "Cancelling old buy order {} at {}",
        order.id,
        order.price
      );

      match self.gateway.cancel_order(&self.settings.pair, &order.id).await {
        Ok(()) => {
          report.cancelled += 1;
          self.tracked.remove(&order.id);
          if self.place_buy(price).await {
            report.replaced += 1;
          } else {
            report.buy_failures += 1;
          }
        }
        Err(GatewayError::NotFound(msg)) => {
          report.cancel_failures += 1;
          info!(order_id = %order.id, reason = %msg, "Buy already closed on venue, not replacing");
        }
        Err(e) => {
          report.cancel_failures += 1;
          warn!(order_id = %order.id, error = %e, kind = e.kind(), "Cancel failed, will retry next cycle");
        }
      }
    }
  }

  /// Convert new buy fills into paired sells, then drop converted buys
  /// that have left the book.
  ///
  /// The order id is marked before the sell is attempted: a failed sell
  /// is logged and never retried.
  async fn convert_fills(&mut self, open: Option<&[Order]>, report: &mut CycleReport) {
    let pair = &self.settings.pair;
    let fills = match self
      .gateway
      .recent_fills(pair, self.settings.fill_history_limit)
      .await
    {
      Ok(fills) => fills,
      Err(e) => {
        warn!(error = %e, kind = e.kind(), "Failed to fetch recent fills, skipping conversion");
        report.skipped_steps += 1;
        return;
      }
    };

    for fill in fills.iter().filter(|f| f.side == TradeSide::Buy) {
      if !self.executed.mark(&fill.order_id) {
        continue;
      }
      report.fills_converted += 1;
      info!(
        order_id = %fill.order_id,
        trade_id = %fill.trade_id,
        price = %fill.price,
        "Buy order executed at {}",
        fill.price
      );

      let Some(sell_price) = self.pricing.sell_price(fill.price) else {
        report.sell_failures += 1;
        warn!(fill_price = %fill.price, "Sell price not representable, skipping sell");
        continue;
      };

      match self
        .gateway
        .place_limit_order(pair, TradeSide::Sell, self.settings.order_amount, sell_price)
        .await
      {
        Ok(order) => {
          info!(order_id = %order.id, price = %sell_price, "Placed sell order at {sell_price}");
        }
        Err(e) => {
          report.sell_failures += 1;
          warn!(
            buy_order_id = %fill.order_id,
            price = %sell_price,
            error = %e,
            kind = e.kind(),
            "Error placing sell order, fill will not be retried"
          );
        }
      }
    }

    // Without an open-orders snapshot we cannot tell filled from partial.
    if let Some(open) = open {
      let open_ids: HashSet<&str> = open.iter().map(|o| o.id.as_str()).collect();
      for id in self.tracked.prune_converted(&open_ids, &self.executed) {
        debug!(order_id = %id, "Filled buy removed from ladder");
      }
    }
  }

  /// Place at most one buy if the ladder is below target.
  async fn replenish(&mut self, price: Decimal, report: &mut CycleReport) {
    if self.tracked.len() >= self.settings.target_depth {
      return;
    }
    info!(
      tracked = self.tracked.len(),
      target = self.settings.target_depth,
      "Creating new buy order"
    );
    if self.place_buy(price).await {
      report.buys_placed += 1;
    } else {
      report.buy_failures += 1;
    }
  }

  /// Place one ladder buy below `market` and track it on success.
  async fn place_buy(&mut self, market: Decimal) -> bool {
    let Some(buy_price) = self.pricing.buy_price(market) else {
      warn!(market = %market, offset = %self.settings.offset, "Buy price would not be positive, skipping");
      return false;
    };

    match self
      .gateway
      .place_limit_order(
        &self.settings.pair,
        TradeSide::Buy,
        self.settings.order_amount,
        buy_price,
      )
      .await
    {
      Ok(order) => {
        info!(order_id = %order.id, price = %buy_price, "Placed buy order at {buy_price}");
        self.tracked.insert(order.id, buy_price);
        true
      }
      Err(e) => {
        warn!(price = %buy_price, error = %e, kind = e.kind(), "Error placing buy order");
        false
      }
    }
  }

  /// Cancel every tracked buy (graceful shutdown).
  ///
  /// Best effort: failures are logged and the order is forgotten anyway.
  /// Returns how many cancels the venue accepted.
  #[instrument(skip(self), fields(pair = %self.settings.pair))]
  pub async fn cancel_tracked(&mut self) -> usize {
    let ids: Vec<String> = self.tracked.ids().cloned().collect();
    let mut cancelled = 0;
    for id in ids {
      match self.gateway.cancel_order(&self.settings.pair, &id).await {
        Ok(()) => cancelled += 1,
        Err(e) => warn!(order_id = %id, error = %e, "Failed to cancel buy on shutdown"),
      }
      self.tracked.remove(&id);
    }
    info!(cancelled, "Tracked buys cancelled");
    cancelled
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::trade::Fill;
  use crate::ports::gateway::MockMarketGateway;
  use rust_decimal_macros::dec;

  fn settings(depth: usize) -> LadderSettings {
    LadderSettings {
      pair: "BTC/USDT".parse().unwrap(),
      order_amount: dec!(0.5),
      offset: dec!(1),
      target_depth: depth,
      max_order_age: TimeDelta::seconds(180),
      fill_history_limit: 50,
      rounding: TickRounding::HalfEven,
    }
  }

  fn buy(id: &str, price: Decimal, placed_at: DateTime<Utc>) -> Order {
    Order {
      id: id.to_string(),
      side: TradeSide::Buy,
      price,
      amount: dec!(0.5),
      placed_at,
    }
  }

  fn buy_fill(order_id: &str, price: Decimal) -> Fill {
    Fill {
      trade_id: format!("t-{order_id}"),
      order_id: order_id.to_string(),
      side: TradeSide::Buy,
      price,
      amount: dec!(0.5),
      timestamp: Utc::now(),
    }
  }

  fn controller(mock: MockMarketGateway, depth: usize) -> LadderController<MockMarketGateway> {
    let tick = TickSize::new(dec!(0.1)).unwrap();
    LadderController::new(Arc::new(mock), settings(depth), tick)
  }

  #[tokio::test]
  async fn test_start_fails_without_tick_size() {
    let mut mock = MockMarketGateway::new();
    mock
      .expect_tick_size()
      .returning(|p| Err(GatewayError::UnknownPair(p.to_string())));

    let result = LadderController::start(Arc::new(mock), settings(2)).await;
    assert!(matches!(result, Err(GatewayError::UnknownPair(_))));
  }

  #[tokio::test]
  async fn test_snapshot_failure_places_nothing() {
    let mut mock = MockMarketGateway::new();
    mock
      .expect_current_price()
      .returning(|_| Err(GatewayError::Unavailable("timeout".into())));
    mock.expect_open_orders().times(0);
    mock.expect_recent_fills().times(0);
    mock.expect_place_limit_order().times(0);
    mock.expect_cancel_order().times(0);

    let mut ctl = controller(mock, 2);
    let err = ctl.run_cycle(Utc::now()).await.unwrap_err();
    assert_eq!(err, CycleError::Snapshot(GatewayError::Unavailable("timeout".into())));
    assert!(ctl.tracked().is_empty());
  }

  #[tokio::test]
  async fn test_replenish_adds_one_buy_per_cycle() {
    let mut mock = MockMarketGateway::new();
    mock.expect_current_price().returning(|_| Ok(dec!(50)));
    mock.expect_open_orders().returning(|_| Ok(vec![]));
    mock.expect_recent_fills().returning(|_, _| Ok(vec![]));
    let mut next_id = 0;
    mock
      .expect_place_limit_order()
      .times(3)
      .returning(move |_, side, amount, price| {
        assert_eq!(side, TradeSide::Buy);
        assert_eq!(price, dec!(49.0));
        next_id += 1;
        Ok(Order {
          id: next_id.to_string(),
          side,
          price,
          amount,
          placed_at: Utc::now(),
        })
      });

    let mut ctl = controller(mock, 3);
    for expected in 1..=3 {
      let report = ctl.run_cycle(Utc::now()).await.unwrap();
      assert_eq!(report.buys_placed, 1);
      assert_eq!(report.tracked, expected);
    }
    // At target: no further placement (times(3) would panic otherwise)
    let report = ctl.run_cycle(Utc::now()).await.unwrap();
    assert_eq!(report.buys_placed, 0);
    assert_eq!(ctl.tracked().len(), 3);
  }

  #[tokio::test]
  async fn test_rejected_buy_is_not_tracked() {
    let mut mock = MockMarketGateway::new();
    mock.expect_current_price().returning(|_| Ok(dec!(50)));
    mock.expect_open_orders().returning(|_| Ok(vec![]));
    mock.expect_recent_fills().returning(|_, _| Ok(vec![]));
    mock
      .expect_place_limit_order()
      .returning(|_, _, _, _| Err(GatewayError::Rejected("insufficient balance".into())));

    let mut ctl = controller(mock, 2);
    let report = ctl.run_cycle(Utc::now()).await.unwrap();
    assert_eq!(report.buy_failures, 1);
    assert_eq!(report.buys_placed, 0);
    assert!(ctl.tracked().is_empty());
  }

  #[tokio::test]
  async fn test_expiry_boundary() {
    let now = Utc::now();
    let at_limit = buy("at_limit", dec!(48), now - TimeDelta::seconds(180));
    let past_limit = buy(
      "past_limit",
      dec!(48),
      now - TimeDelta::seconds(180) - TimeDelta::milliseconds(1),
    );
    let open = vec![at_limit, past_limit];

    let mut mock = MockMarketGateway::new();
    mock.expect_current_price().returning(|_| Ok(dec!(50)));
    mock.expect_open_orders().returning(move |_| Ok(open.clone()));
    mock.expect_recent_fills().returning(|_, _| Ok(vec![]));
    mock
      .expect_cancel_order()
      .withf(|_, id| id == "past_limit")
      .times(1)
      .returning(|_, _| Ok(()));
    mock
      .expect_place_limit_order()
      .returning(|_, side, amount, price| {
        Ok(Order {
          id: "replacement".into(),
          side,
          price,
          amount,
          placed_at: Utc::now(),
        })
      });

    // Depth 1: the replacement fills the ladder, no extra buy
    let mut ctl = controller(mock, 1);
    let report = ctl.run_cycle(now).await.unwrap();
    assert_eq!(report.cancelled, 1);
    assert_eq!(report.replaced, 1);
    assert_eq!(report.buys_placed, 0);
    assert_eq!(ctl.tracked().price_of("replacement"), Some(dec!(49.0)));
  }

  #[tokio::test]
  async fn test_cancel_not_found_skips_replacement() {
    let now = Utc::now();
    let stale = buy("gone", dec!(48), now - TimeDelta::seconds(600));

    let mut mock = MockMarketGateway::new();
    mock.expect_current_price().returning(|_| Ok(dec!(50)));
    mock.expect_open_orders().returning(move |_| Ok(vec![stale.clone()]));
    mock.expect_recent_fills().returning(|_, _| Ok(vec![]));
    mock
      .expect_cancel_order()
      .returning(|_, id| Err(GatewayError::NotFound(id.to_string())));
    mock.expect_place_limit_order().times(0);

    // Depth 0 keeps replenishment out of the picture
    let mut ctl = controller(mock, 0);
    let report = ctl.run_cycle(now).await.unwrap();
    assert_eq!(report.cancel_failures, 1);
    assert_eq!(report.replaced, 0);
  }

  #[tokio::test]
  async fn test_sell_orders_never_expire() {
    let now = Utc::now();
    let old_sell = Order {
      id: "sell".into(),
      side: TradeSide::Sell,
      price: dec!(60),
      amount: dec!(0.5),
      placed_at: now - TimeDelta::days(2),
    };

    let mut mock = MockMarketGateway::new();
    mock.expect_current_price().returning(|_| Ok(dec!(50)));
    mock.expect_open_orders().returning(move |_| Ok(vec![old_sell.clone()]));
    mock.expect_recent_fills().returning(|_, _| Ok(vec![]));
    mock.expect_cancel_order().times(0);

    let mut ctl = controller(mock, 0);
    let report = ctl.run_cycle(now).await.unwrap();
    assert_eq!(report.cancelled, 0);
  }

  #[tokio::test]
  async fn test_failed_sell_is_not_retried() {
    let mut mock = MockMarketGateway::new();
    mock.expect_current_price().returning(|_| Ok(dec!(50)));
    mock.expect_open_orders().returning(|_| Ok(vec![]));
    mock
      .expect_recent_fills()
      .returning(|_, _| Ok(vec![buy_fill("b1", dec!(49))]));
    mock
      .expect_place_limit_order()
      .times(1)
      .returning(|_, _, _, _| Err(GatewayError::Unavailable("reset".into())));

    let mut ctl = controller(mock, 0);
    let first = ctl.run_cycle(Utc::now()).await.unwrap();
    assert_eq!(first.fills_converted, 1);
    assert_eq!(first.sell_failures, 1);

    assert_eq!(first.executed, 1);

    for _ in 0..5 {
      let report = ctl.run_cycle(Utc::now()).await.unwrap();
      assert_eq!(report.fills_converted, 0);
      assert_eq!(report.executed, 1);
    }
    assert!(ctl.executed().contains("b1"));
  }

  #[tokio::test]
  async fn test_open_orders_failure_skips_expiry_only() {
    let mut mock = MockMarketGateway::new();
    mock.expect_current_price().returning(|_| Ok(dec!(50)));
    mock
      .expect_open_orders()
      .returning(|_| Err(GatewayError::Unavailable("503".into())));
    mock.expect_recent_fills().returning(|_, _| Ok(vec![]));
    mock.expect_cancel_order().times(0);
    mock
      .expect_place_limit_order()
      .times(1)
      .returning(|_, side, amount, price| {
        Ok(Order {
          id: "b".into(),
          side,
          price,
          amount,
          placed_at: Utc::now(),
        })
      });

    let mut ctl = controller(mock, 1);
    let report = ctl.run_cycle(Utc::now()).await.unwrap();
    assert_eq!(report.skipped_steps, 1);
    assert_eq!(report.buys_placed, 1);
  }

  #[tokio::test]
  async fn test_cancel_tracked_on_shutdown() {
    let mut mock = MockMarketGateway::new();
    mock.expect_current_price().returning(|_| Ok(dec!(50)));
    mock.expect_open_orders().returning(|_| Ok(vec![]));
    mock.expect_recent_fills().returning(|_, _| Ok(vec![]));
    mock
      .expect_place_limit_order()
      .returning(|_, side, amount, price| {
        Ok(Order {
          id: "b1".into(),
          side,
          price,
          amount,
          placed_at: Utc::now(),
        })
      });
    mock
      .expect_cancel_order()
      .withf(|_, id| id == "b1")
      .times(1)
      .returning(|_, _| Ok(()));

    let mut ctl = controller(mock, 1);
    ctl.run_cycle(Utc::now()).await.unwrap();
    assert_eq!(ctl.cancel_tracked().await, 1);
    assert!(ctl.tracked().is_empty());
  }
}
