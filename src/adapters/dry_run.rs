//! Dry-Run Gateway — Read-Through, Simulated Writes
//!
//! Wraps a real gateway so the ladder can run against live market
//! data without touching the account. Reads are forwarded; placements
//! and cancels are logged and answered locally.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::domain::pricing::TickSize;
use crate::domain::trade::{Fill, Order, TradeSide, TradingPair};
use crate::ports::gateway::{GatewayResult, MarketGateway};

/// Gateway decorator that never sends orders.
///
/// Simulated orders never appear in `open_orders` or `recent_fills`
/// (those come from the venue), so the ladder stays at one buy per
/// cycle until the venue reports otherwise.
pub struct DryRunGateway<G: MarketGateway> {
    inner: Arc<G>,
}

impl<G: MarketGateway> DryRunGateway<G> {
    pub fn new(inner: Arc<G>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<G: MarketGateway> MarketGateway for DryRunGateway<G> {
    async fn current_price(&self, pair: &TradingPair) -> GatewayResult<Decimal> {
        self.inner.current_price(pair).await
    }

    async fn open_orders(&self, pair: &TradingPair) -> GatewayResult<Vec<Order>> {
        self.inner.open_orders(pair).await
    }

    async fn recent_fills(&self, pair: &TradingPair, limit: u16) -> GatewayResult<Vec<Fill>> {
        self.inner.recent_fills(pair, limit).await
    }

    async fn place_limit_order(
        &self,
        pair: &TradingPair,
        side: TradeSide,
        amount: Decimal,
        price: Decimal,
    ) -> GatewayResult<Order> {
        let id = format!("dry-{}", Uuid::new_v4().simple());
        info!(
            dry_run = true,
            order_id = %id,
            pair = %pair,
            side = %side,
            %amount,
            %price,
            "Simulated limit order"
        );
        Ok(Order {
            id,
            side,
            price,
            amount,
            placed_at: Utc::now(),
        })
    }

    async fn cancel_order(&self, pair: &TradingPair, order_id: &str) -> GatewayResult<()> {
        info!(dry_run = true, pair = %pair, order_id, "Simulated cancel");
        Ok(())
    }

    async fn tick_size(&self, pair: &TradingPair) -> GatewayResult<TickSize> {
        self.inner.tick_size(pair).await
    }
}
