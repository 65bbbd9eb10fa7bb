//! Ladder Runner - Cooperative Cycle Scheduler
//!
//! Drives `LadderController::run_cycle` at a fixed cadence. A cycle
//! that fails at the price snapshot is retried after a short cooldown
//! instead of the full interval. Shutdown is only observed between
//! cycles, so a cycle in flight always completes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::ports::gateway::MarketGateway;
use crate::ports::telemetry::CycleObserver;

use super::ladder_controller::{CycleError, CycleReport, LadderController};

/// Pause lengths between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerTiming {
  /// After a completed cycle.
  pub cycle_interval: Duration,
  /// After a failed cycle.
  pub error_cooldown: Duration,
}

impl RunnerTiming {
  /// How long to wait after a cycle with this outcome.
  pub fn delay_after(&self, outcome: &Result<CycleReport, CycleError>) -> Duration {
    match outcome {
      Ok(_) => self.cycle_interval,
      Err(_) => self.error_cooldown,
    }
  }
}

/// Totals for one runner lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
  /// Cycles that ran to completion.
  pub completed: u64,
  /// Cycles abandoned at the snapshot.
  pub failed: u64,
  /// Buys cancelled on shutdown.
  pub cancelled_on_shutdown: usize,
}

/// Owns the controller and runs it until shutdown.
pub struct LadderRunner<G: MarketGateway> {
  /// Ladder state machine.
  controller: LadderController<G>,
  /// Cadence and cooldown.
  timing: RunnerTiming,
  /// Optional metrics/health sink.
  observer: Option<Arc<dyn CycleObserver>>,
  /// Cancel tracked buys when stopping.
  cancel_on_shutdown: bool,
}

impl<G: MarketGateway> LadderRunner<G> {
  /// Create a runner with no observer that leaves orders on shutdown.
  pub fn new(controller: LadderController<G>, timing: RunnerTiming) -> Self {
    Self {
      controller,
      timing,
      observer: None,
      cancel_on_shutdown: false,
    }
  }

  /// Report every cycle to `observer`.
  #[must_use]
  pub fn with_observer(mut self, observer: Arc<dyn CycleObserver>) -> Self {
    self.observer = Some(observer);
    self
  }

  /// Cancel tracked buys when the runner stops.
  #[must_use]
  pub fn cancel_on_shutdown(mut self, enabled: bool) -> Self {
    self.cancel_on_shutdown = enabled;
    self
  }

  /// Run cycles until a shutdown signal arrives (or its sender is dropped).
  ///
  /// Never returns early on trading errors: a failed cycle only changes
  /// how long the next wait is.
  #[instrument(skip_all, name = "ladder_loop", fields(pair = %self.controller.settings().pair))]
  pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) -> RunSummary {
    let mut summary = RunSummary::default();
    info!(
      interval_secs = self.timing.cycle_interval.as_secs(),
      cooldown_secs = self.timing.error_cooldown.as_secs(),
      depth = self.controller.settings().target_depth,
      "Ladder runner started"
    );

    loop {
      let outcome = self.controller.run_cycle(Utc::now()).await;
      let delay = self.timing.delay_after(&outcome);

      match &outcome {
        Ok(report) => {
          summary.completed += 1;
          if let Some(observer) = &self.observer {
            observer.cycle_completed(report);
          }
          info!(
            tracked = report.tracked,
            converted = report.fills_converted,
            replaced = report.replaced,
            placed = report.buys_placed,
            "Waiting {}s before checking again...",
            delay.as_secs()
          );
        }
        Err(e) => {
          summary.failed += 1;
          if let Some(observer) = &self.observer {
            observer.cycle_failed(e.gateway_error());
          }
          warn!(
            error = %e,
            "Error in main process, restarting in {}s",
            delay.as_secs()
          );
        }
      }

      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Ladder runner received shutdown signal");
          break;
        }
        () = tokio::time::sleep(delay) => {}
      }
    }

    if let Some(observer) = &self.observer {
      observer.shutting_down();
    }
    if self.cancel_on_shutdown {
      summary.cancelled_on_shutdown = self.controller.cancel_tracked().await;
    }

    info!(
      completed = summary.completed,
      failed = summary.failed,
      "Ladder runner stopped"
    );
    summary
  }
}
