//! Prometheus Metrics Registry - Ladder Observability
//!
//! Registers the bot's Prometheus metrics and records every cycle
//! outcome through the `CycleObserver` port. Exposed on :9090 by the
//! health server for Grafana dashboards.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use prometheus::{
    Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use crate::ports::gateway::GatewayError;
use crate::ports::telemetry::CycleObserver;
use crate::usecases::ladder_controller::CycleReport;

/// Centralized Prometheus metrics for the ladder bot.
///
/// All metrics follow the naming convention `ladder_bot_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Cycles by outcome (`completed`, `failed`).
    pub cycles: IntCounterVec,
    /// Snapshot failures by gateway error kind.
    pub cycle_errors: IntCounterVec,
    /// Orders placed by side.
    pub orders_placed: IntCounterVec,
    /// Stale buys cancelled.
    pub orders_cancelled: IntCounter,
    /// Failed cancels and placements by step (`cancel`, `sell`, `buy`).
    pub order_failures: IntCounterVec,
    /// Buys currently tracked by the controller.
    pub tracked_buys: IntGauge,
    /// Buy orders remembered as already converted into a sell.
    pub executed_buys: IntGauge,
    /// Last observed market price.
    pub last_price: Gauge,
    /// Unix time of the last completed cycle.
    pub last_cycle_timestamp: Gauge,
    /// Readiness: a cycle has completed and the latest one did not fail.
    ready: AtomicBool,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let cycles = IntCounterVec::new(
            Opts::new("ladder_bot_cycles_total", "Ladder cycles by outcome"),
            &["outcome"],
        )?;

        let cycle_errors = IntCounterVec::new(
            Opts::new(
                "ladder_bot_cycle_errors_total",
                "Cycles abandoned at the price snapshot, by error kind",
            ),
            &["kind"],
        )?;

        let orders_placed = IntCounterVec::new(
            Opts::new("ladder_bot_orders_placed_total", "Limit orders placed"),
            &["side"],
        )?;

        let orders_cancelled = IntCounter::new(
            "ladder_bot_orders_cancelled_total",
            "Stale buy orders cancelled",
        )?;

        let order_failures = IntCounterVec::new(
            Opts::new(
                "ladder_bot_order_failures_total",
                "Failed cancels and placements by step",
            ),
            &["step"],
        )?;

        let tracked_buys = IntGauge::new(
            "ladder_bot_tracked_buys",
            "Buy orders currently tracked by the controller",
        )?;

        let executed_buys = IntGauge::new(
            "ladder_bot_executed_buys",
            "Buy orders remembered as already converted into a sell",
        )?;

        let last_price = Gauge::new("ladder_bot_last_price", "Last observed market price")?;

        let last_cycle_timestamp = Gauge::new(
            "ladder_bot_last_cycle_timestamp_seconds",
            "Unix time of the last completed cycle",
        )?;

        // Register all metrics
        registry.register(Box::new(cycles.clone()))?;
        registry.register(Box::new(cycle_errors.clone()))?;
        registry.register(Box::new(orders_placed.clone()))?;
        registry.register(Box::new(orders_cancelled.clone()))?;
        registry.register(Box::new(order_failures.clone()))?;
        registry.register(Box::new(tracked_buys.clone()))?;
        registry.register(Box::new(executed_buys.clone()))?;
        registry.register(Box::new(last_price.clone()))?;
        registry.register(Box::new(last_cycle_timestamp.clone()))?;

        Ok(Self {
            registry,
            cycles,
            cycle_errors,
            orders_placed,
            orders_cancelled,
            order_failures,
            tracked_buys,
            executed_buys,
            last_price,
            last_cycle_timestamp,
            ready: AtomicBool::new(false),
        })
    }

    /// Whether the bot is trading normally.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    /// Render all metrics in the Prometheus text format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

fn as_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

impl CycleObserver for MetricsRegistry {
    fn cycle_completed(&self, report: &CycleReport) {
        self.cycles.with_label_values(&["completed"]).inc();

        self.orders_cancelled.inc_by(as_u64(report.cancelled));
        self.orders_placed
            .with_label_values(&["buy"])
            .inc_by(as_u64(report.buys_placed + report.replaced));
        self.orders_placed
            .with_label_values(&["sell"])
            .inc_by(as_u64(report.fills_converted.saturating_sub(report.sell_failures)));
        self.order_failures
            .with_label_values(&["cancel"])
            .inc_by(as_u64(report.cancel_failures));
        self.order_failures
            .with_label_values(&["sell"])
            .inc_by(as_u64(report.sell_failures));
        self.order_failures
            .with_label_values(&["buy"])
            .inc_by(as_u64(report.buy_failures));

        self.tracked_buys
            .set(i64::try_from(report.tracked).unwrap_or(i64::MAX));
        self.executed_buys
            .set(i64::try_from(report.executed).unwrap_or(i64::MAX));
        if let Some(price) = report.price.to_f64() {
            self.last_price.set(price);
        }
        #[allow(clippy::cast_precision_loss)]
        let now_secs = Utc::now().timestamp() as f64;
        self.last_cycle_timestamp.set(now_secs);

        self.ready.store(true, Ordering::Relaxed);
    }

    fn cycle_failed(&self, error: &GatewayError) {
        self.cycles.with_label_values(&["failed"]).inc();
        self.cycle_errors.with_label_values(&[error.kind()]).inc();
        self.ready.store(false, Ordering::Relaxed);
        debug!(kind = error.kind(), "Recorded failed cycle");
    }

    fn shutting_down(&self) {
        self.ready.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_completed_cycle_updates_metrics() {
        let metrics = MetricsRegistry::new().unwrap();
        assert!(!metrics.is_ready());

        let report = CycleReport {
            price: dec!(50),
            cancelled: 1,
            replaced: 1,
            fills_converted: 2,
            buys_placed: 1,
            tracked: 3,
            executed: 7,
            ..CycleReport::default()
        };
        metrics.cycle_completed(&report);

        assert!(metrics.is_ready());
        assert_eq!(metrics.cycles.with_label_values(&["completed"]).get(), 1);
        assert_eq!(metrics.orders_placed.with_label_values(&["buy"]).get(), 2);
        assert_eq!(metrics.orders_placed.with_label_values(&["sell"]).get(), 2);
        assert_eq!(metrics.orders_cancelled.get(), 1);
        assert_eq!(metrics.tracked_buys.get(), 3);
        assert_eq!(metrics.executed_buys.get(), 7);
        assert!((metrics.last_price.get() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_failed_cycle_clears_readiness() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.cycle_completed(&CycleReport::default());
        metrics.cycle_failed(&GatewayError::Unavailable("timeout".into()));

        assert!(!metrics.is_ready());
        assert_eq!(metrics.cycles.with_label_values(&["failed"]).get(), 1);
        assert_eq!(
            metrics.cycle_errors.with_label_values(&["unavailable"]).get(),
            1
        );
    }

    #[test]
    fn test_encode_contains_metric_names() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.cycle_completed(&CycleReport::default());
        let text = metrics.encode().unwrap();
        assert!(text.contains("ladder_bot_cycles_total"));
        assert!(text.contains("ladder_bot_tracked_buys"));
        assert!(text.contains("ladder_bot_executed_buys"));
    }
}
