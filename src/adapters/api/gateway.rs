//! Binance Gateway — `MarketGateway` over the Spot REST API
//!
//! Maps each port call to exactly one REST request through the shared
//! `VenueClient`, then classifies failures into the tagged
//! `GatewayError` kinds the controller branches on.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, StatusCode};
use rust_decimal::Decimal;
use serde::de::IgnoredAny;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::client::{RequestError, VenueClient};
use super::types::{ExchangeInfo, OrderResponse, TickerPrice, TradeResponse};
use crate::domain::pricing::TickSize;
use crate::domain::trade::{Fill, Order, TradeSide, TradingPair};
use crate::ports::gateway::{GatewayError, GatewayResult, MarketGateway};

/// "Unknown order sent."
const CODE_UNKNOWN_ORDER: i64 = -2011;
/// "Order does not exist."
const CODE_NO_SUCH_ORDER: i64 = -2013;
/// "Invalid symbol."
const CODE_BAD_SYMBOL: i64 = -1121;

/// Which port operation a failed request belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Read,
    Place,
    Cancel,
}

/// Venue gateway backed by the shared signed client.
///
/// Holds no trading state; safe to share behind an `Arc`.
pub struct BinanceGateway {
    client: Arc<VenueClient>,
}

impl BinanceGateway {
    pub fn new(client: Arc<VenueClient>) -> Self {
        Self { client }
    }
}

/// Turn a transport/venue failure into the port's error vocabulary.
fn classify(op: Operation, err: RequestError) -> GatewayError {
    let text = err.to_string();
    match err {
        RequestError::Transport(_) | RequestError::Decode(_) => GatewayError::Unavailable(text),
        RequestError::Unauthenticated => match op {
            Operation::Place => GatewayError::Rejected(text),
            Operation::Read | Operation::Cancel => GatewayError::Unavailable(text),
        },
        RequestError::Api { status, code, .. } => {
            if status == StatusCode::TOO_MANY_REQUESTS
                || status.as_u16() == 418
                || status.is_server_error()
            {
                return GatewayError::Unavailable(text);
            }
            match (op, code) {
                (_, Some(CODE_BAD_SYMBOL)) => GatewayError::UnknownPair(text),
                (Operation::Cancel, Some(CODE_UNKNOWN_ORDER | CODE_NO_SUCH_ORDER)) => {
                    GatewayError::NotFound(text)
                }
                (Operation::Place, _) if status.is_client_error() => GatewayError::Rejected(text),
                _ => GatewayError::Unavailable(text),
            }
        }
    }
}

fn side_param(side: TradeSide) -> &'static str {
    match side {
        TradeSide::Buy => "BUY",
        TradeSide::Sell => "SELL",
    }
}

#[async_trait]
impl MarketGateway for BinanceGateway {
    #[instrument(skip(self), fields(pair = %pair))]
    async fn current_price(&self, pair: &TradingPair) -> GatewayResult<Decimal> {
        let ticker: TickerPrice = self
            .client
            .get_public("/api/v3/ticker/price", &[("symbol", pair.symbol())])
            .await
            .map_err(|e| classify(Operation::Read, e))?;
        Ok(ticker.price)
    }

    #[instrument(skip(self), fields(pair = %pair))]
    async fn open_orders(&self, pair: &TradingPair) -> GatewayResult<Vec<Order>> {
        let raw: Vec<OrderResponse> = self
            .client
            .send_signed(Method::GET, "/api/v3/openOrders", &[("symbol", pair.symbol())])
            .await
            .map_err(|e| classify(Operation::Read, e))?;

        let now = Utc::now();
        let total = raw.len();
        let orders: Vec<Order> = raw.into_iter().filter_map(|o| o.into_order(now)).collect();
        if orders.len() < total {
            warn!(skipped = total - orders.len(), "Ignoring open orders with unknown side");
        }
        Ok(orders)
    }

    #[instrument(skip(self), fields(pair = %pair))]
    async fn recent_fills(&self, pair: &TradingPair, limit: u16) -> GatewayResult<Vec<Fill>> {
        let raw: Vec<TradeResponse> = self
            .client
            .send_signed(
                Method::GET,
                "/api/v3/myTrades",
                &[("symbol", pair.symbol()), ("limit", limit.to_string())],
            )
            .await
            .map_err(|e| classify(Operation::Read, e))?;
        Ok(raw.into_iter().filter_map(TradeResponse::into_fill).collect())
    }

    #[instrument(skip(self), fields(pair = %pair, side = %side, %amount, %price))]
    async fn place_limit_order(
        &self,
        pair: &TradingPair,
        side: TradeSide,
        amount: Decimal,
        price: Decimal,
    ) -> GatewayResult<Order> {
        let client_id = Uuid::new_v4().simple().to_string();
        let params = [
            ("symbol", pair.symbol()),
            ("side", side_param(side).to_string()),
            ("type", "LIMIT".to_string()),
            ("timeInForce", "GTC".to_string()),
            ("quantity", amount.normalize().to_string()),
            ("price", price.normalize().to_string()),
            ("newClientOrderId", client_id),
            ("newOrderRespType", "RESULT".to_string()),
        ];
        let resp: OrderResponse = self
            .client
            .send_signed(Method::POST, "/api/v3/order", &params)
            .await
            .map_err(|e| classify(Operation::Place, e))?;

        let order = resp
            .into_order(Utc::now())
            .ok_or_else(|| GatewayError::Unavailable("order response with unknown side".into()))?;
        debug!(order_id = %order.id, "Venue accepted order");
        Ok(order)
    }

    #[instrument(skip(self), fields(pair = %pair))]
    async fn cancel_order(&self, pair: &TradingPair, order_id: &str) -> GatewayResult<()> {
        let _: IgnoredAny = self
            .client
            .send_signed(
                Method::DELETE,
                "/api/v3/order",
                &[("symbol", pair.symbol()), ("orderId", order_id.to_string())],
            )
            .await
            .map_err(|e| classify(Operation::Cancel, e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(pair = %pair))]
    async fn tick_size(&self, pair: &TradingPair) -> GatewayResult<TickSize> {
        let symbol = pair.symbol();
        let info: ExchangeInfo = self
            .client
            .get_public("/api/v3/exchangeInfo", &[("symbol", symbol.clone())])
            .await
            .map_err(|e| classify(Operation::Read, e))?;

        let raw = info
            .tick_size(&symbol)
            .ok_or_else(|| GatewayError::UnknownPair(format!("{pair} has no price filter")))?;
        TickSize::new(raw).map_err(|e| GatewayError::UnknownPair(format!("{pair}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, code: Option<i64>) -> RequestError {
        RequestError::Api {
            status: StatusCode::from_u16(status).unwrap(),
            code,
            msg: "x".into(),
        }
    }

    #[test]
    fn test_transport_is_unavailable() {
        for op in [Operation::Read, Operation::Place, Operation::Cancel] {
            let err = classify(op, RequestError::Transport("timeout".into()));
            assert!(matches!(err, GatewayError::Unavailable(_)));
        }
    }

    #[test]
    fn test_throttle_and_server_errors_are_unavailable() {
        for status in [429, 418, 500, 503] {
            let err = classify(Operation::Place, api(status, Some(-1003)));
            assert!(matches!(err, GatewayError::Unavailable(_)), "status {status}");
        }
    }

    #[test]
    fn test_cancel_unknown_order_is_not_found() {
        for code in [CODE_UNKNOWN_ORDER, CODE_NO_SUCH_ORDER] {
            let err = classify(Operation::Cancel, api(400, Some(code)));
            assert!(matches!(err, GatewayError::NotFound(_)));
        }
    }

    #[test]
    fn test_bad_symbol_is_unknown_pair() {
        let err = classify(Operation::Read, api(400, Some(CODE_BAD_SYMBOL)));
        assert!(matches!(err, GatewayError::UnknownPair(_)));
    }

    #[test]
    fn test_placement_4xx_is_rejected() {
        // -1013: filter failure (tick size, min notional).
        let err = classify(Operation::Place, api(400, Some(-1013)));
        assert!(matches!(err, GatewayError::Rejected(_)));
        // -2010: insufficient balance.
        let err = classify(Operation::Place, api(400, Some(-2010)));
        assert!(matches!(err, GatewayError::Rejected(_)));
    }

    #[test]
    fn test_read_4xx_is_unavailable() {
        let err = classify(Operation::Read, api(400, Some(-1100)));
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }

    #[test]
    fn test_missing_credentials_reject_only_placements() {
        let err = classify(Operation::Place, RequestError::Unauthenticated);
        assert!(matches!(err, GatewayError::Rejected(_)));
        for op in [Operation::Read, Operation::Cancel] {
            let err = classify(op, RequestError::Unauthenticated);
            assert!(matches!(err, GatewayError::Unavailable(_)));
        }
    }

    #[test]
    fn test_side_param() {
        assert_eq!(side_param(TradeSide::Buy), "BUY");
        assert_eq!(side_param(TradeSide::Sell), "SELL");
    }
}
