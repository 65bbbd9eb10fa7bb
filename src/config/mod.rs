//! Configuration Module - TOML-based Bot Configuration
//!
//! Loads and validates configuration from `config.toml`. Venue
//! credentials are never stored here; they come from the environment
//! (see `adapters::api::auth`). Configuration is read once at startup
//! and never reloaded.

pub mod loader;

use std::time::Duration;

use chrono::TimeDelta;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::pricing::TickRounding;
use crate::domain::trade::TradingPair;

/// Top-level bot configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the bot begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Bot identity and run mode.
  #[serde(default)]
  pub bot: BotConfig,
  /// Ladder parameters for the single traded pair.
  pub ladder: LadderConfig,
  /// Venue REST endpoint settings.
  #[serde(default)]
  pub api: ApiConfig,
  /// Metrics and health endpoints.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
  /// Human-readable bot name.
  #[serde(default = "default_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Enable dry-run mode (reads hit the venue, writes are simulated).
  #[serde(default)]
  pub dry_run: bool,
}

impl Default for BotConfig {
  fn default() -> Self {
    Self {
      name: default_name(),
      log_level: default_log_level(),
      dry_run: false,
    }
  }
}

/// Ladder configuration.
///
/// `pair`, `order_amount`, `offset` and `target_depth` are required;
/// the timing knobs default to the classic 60s / 180s / 5s cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct LadderConfig {
  /// Traded pair as `BASE/QUOTE`.
  pub pair: TradingPair,
  /// Fixed size of every buy and paired sell, in base units.
  pub order_amount: Decimal,
  /// Distance below market for buys and above fill price for sells.
  pub offset: Decimal,
  /// Number of concurrent buy orders to maintain.
  pub target_depth: usize,
  /// Pause between successful cycles (seconds).
  #[serde(default = "default_cycle_interval")]
  pub cycle_interval_secs: u64,
  /// Buys resting longer than this are cancelled and re-placed (seconds).
  #[serde(default = "default_max_order_age")]
  pub max_order_age_secs: u64,
  /// Pause after a failed cycle before retrying (seconds).
  #[serde(default = "default_error_cooldown")]
  pub error_cooldown_secs: u64,
  /// How many recent trades to scan for fills each cycle.
  #[serde(default = "default_fill_history_limit")]
  pub fill_history_limit: u16,
  /// Midpoint rounding mode for tick alignment.
  #[serde(default)]
  pub rounding: TickRounding,
  /// Cancel tracked buys when the bot stops.
  #[serde(default)]
  pub cancel_on_shutdown: bool,
}

impl LadderConfig {
  pub fn cycle_interval(&self) -> Duration {
    Duration::from_secs(self.cycle_interval_secs)
  }

  pub fn error_cooldown(&self) -> Duration {
    Duration::from_secs(self.error_cooldown_secs)
  }

  pub fn max_order_age(&self) -> TimeDelta {
    TimeDelta::from_std(Duration::from_secs(self.max_order_age_secs)).unwrap_or(TimeDelta::MAX)
  }
}

/// Venue API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// REST API base URL.
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Transport timeout per request (milliseconds).
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  /// Signed-request validity window (milliseconds).
  #[serde(default = "default_recv_window_ms")]
  pub recv_window_ms: u64,
  /// Client-side request throttle.
  #[serde(default = "default_max_requests_per_second")]
  pub max_requests_per_second: u32,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_ms: default_timeout_ms(),
      recv_window_ms: default_recv_window_ms(),
      max_requests_per_second: default_max_requests_per_second(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Serve /live, /ready and /metrics.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Port for the health/metrics server.
  #[serde(default = "default_metrics_port")]
  pub port: u16,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      port: default_metrics_port(),
    }
  }
}

// Default value functions for serde

fn default_name() -> String {
  "ladder-bot".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_cycle_interval() -> u64 {
  60
}

fn default_max_order_age() -> u64 {
  180
}

fn default_error_cooldown() -> u64 {
  5
}

fn default_fill_history_limit() -> u16 {
  50
}

fn default_base_url() -> String {
  "https://api.binance.com".to_string()
}

fn default_timeout_ms() -> u64 {
  10_000
}

fn default_recv_window_ms() -> u64 {
  5_000
}

fn default_max_requests_per_second() -> u32 {
  10
}

fn default_metrics_port() -> u16 {
  9090
}
