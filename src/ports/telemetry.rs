//! Telemetry Port - Cycle Outcome Sink
//!
//! Lets the runner publish per-cycle results without knowing whether
//! they end up in Prometheus, a health endpoint, or nowhere.

use crate::ports::gateway::GatewayError;
use crate::usecases::ladder_controller::CycleReport;

/// Receives the outcome of every ladder cycle.
pub trait CycleObserver: Send + Sync + 'static {
  /// A cycle ran to completion (individual steps may still have failed).
  fn cycle_completed(&self, report: &CycleReport);

  /// The cycle was abandoned at the price snapshot.
  fn cycle_failed(&self, error: &GatewayError);

  /// The runner is stopping.
  fn shutting_down(&self) {}
}
