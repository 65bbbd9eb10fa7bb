//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::info;

use super::AppConfig;

/// Venue-side cap on trade-history page size.
const MAX_FILL_HISTORY: u16 = 1000;

/// Venue-side cap on the signed-request receive window.
const MAX_RECV_WINDOW_MS: u64 = 60_000;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails (including a malformed pair)
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    pair = %config.ladder.pair,
    amount = %config.ladder.order_amount,
    offset = %config.ladder.offset,
    depth = config.ladder.target_depth,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content).context("Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Positive amount, offset and depth
/// - Non-zero cadence, cooldown and expiry threshold
/// - Trade-history limit and receive window within venue caps
/// - Usable API endpoint
fn validate_config(config: &AppConfig) -> Result<()> {
  let ladder = &config.ladder;

  // Ladder validation
  anyhow::ensure!(
    ladder.order_amount > Decimal::ZERO,
    "order_amount must be positive, got {}",
    ladder.order_amount
  );
  anyhow::ensure!(
    ladder.offset > Decimal::ZERO,
    "offset must be positive, got {}",
    ladder.offset
  );
  anyhow::ensure!(
    ladder.target_depth > 0,
    "target_depth must be at least 1"
  );

  // Timing validation
  anyhow::ensure!(
    ladder.cycle_interval_secs > 0,
    "cycle_interval_secs must be positive"
  );
  anyhow::ensure!(
    ladder.error_cooldown_secs > 0,
    "error_cooldown_secs must be positive"
  );
  anyhow::ensure!(
    ladder.max_order_age_secs > 0,
    "max_order_age_secs must be positive"
  );
  anyhow::ensure!(
    ladder.fill_history_limit > 0 && ladder.fill_history_limit <= MAX_FILL_HISTORY,
    "fill_history_limit must be in (0, {MAX_FILL_HISTORY}], got {}",
    ladder.fill_history_limit
  );

  // API validation
  anyhow::ensure!(
    config.api.base_url.starts_with("http://") || config.api.base_url.starts_with("https://"),
    "api.base_url must be an http(s) URL, got {:?}",
    config.api.base_url
  );
  anyhow::ensure!(config.api.timeout_ms > 0, "api.timeout_ms must be positive");
  anyhow::ensure!(
    config.api.recv_window_ms > 0 && config.api.recv_window_ms <= MAX_RECV_WINDOW_MS,
    "api.recv_window_ms must be in (0, {MAX_RECV_WINDOW_MS}], got {}",
    config.api.recv_window_ms
  );
  anyhow::ensure!(
    config.api.max_requests_per_second > 0,
    "api.max_requests_per_second must be positive"
  );

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::pricing::TickRounding;
  use rust_decimal_macros::dec;

  const MINIMAL: &str = r#"
[ladder]
pair = "btc/usdt"
order_amount = "0.001"
offset = "50"
target_depth = 3
"#;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_minimal_config_gets_defaults() {
    let config = parse_config(MINIMAL).unwrap();
    assert_eq!(config.ladder.pair.symbol(), "BTCUSDT");
    assert_eq!(config.ladder.order_amount, dec!(0.001));
    assert_eq!(config.ladder.offset, dec!(50));
    assert_eq!(config.ladder.target_depth, 3);
    assert_eq!(config.ladder.cycle_interval_secs, 60);
    assert_eq!(config.ladder.max_order_age_secs, 180);
    assert_eq!(config.ladder.error_cooldown_secs, 5);
    assert_eq!(config.ladder.fill_history_limit, 50);
    assert_eq!(config.ladder.rounding, TickRounding::HalfEven);
    assert!(!config.ladder.cancel_on_shutdown);
    assert!(!config.bot.dry_run);
    assert_eq!(config.bot.log_level, "info");
    assert!(config.metrics.enabled);
    assert_eq!(config.api.base_url, "https://api.binance.com");
  }

  #[test]
  fn test_overrides_are_read() {
    let text = r#"
[bot]
name = "ladder-eth"
dry_run = true

[ladder]
pair = "ETH/BTC"
order_amount = 0.5
offset = "0.0001"
target_depth = 1
cycle_interval_secs = 30
rounding = "half_up"
cancel_on_shutdown = true

[metrics]
enabled = false
"#;
    let config = parse_config(text).unwrap();
    assert!(config.bot.dry_run);
    assert_eq!(config.bot.name, "ladder-eth");
    assert_eq!(config.ladder.order_amount, dec!(0.5));
    assert_eq!(config.ladder.cycle_interval().as_secs(), 30);
    assert_eq!(config.ladder.rounding, TickRounding::HalfUp);
    assert!(config.ladder.cancel_on_shutdown);
    assert!(!config.metrics.enabled);
  }

  #[test]
  fn test_missing_required_field_fails() {
    let text = r#"
[ladder]
pair = "BTC/USDT"
order_amount = "0.001"
offset = "50"
"#;
    assert!(parse_config(text).is_err());
  }

  #[test]
  fn test_malformed_pair_fails() {
    let text = MINIMAL.replace("btc/usdt", "BTCUSDT");
    assert!(parse_config(&text).is_err());
  }

  #[test]
  fn test_non_positive_values_fail() {
    assert!(parse_config(&MINIMAL.replace("\"50\"", "\"0\"")).is_err());
    assert!(parse_config(&MINIMAL.replace("\"0.001\"", "\"-1\"")).is_err());
    assert!(parse_config(&MINIMAL.replace("target_depth = 3", "target_depth = 0")).is_err());
  }

  #[test]
  fn test_example_config_is_valid() {
    let config = parse_config(include_str!("../../config.example.toml")).unwrap();
    assert!(config.bot.dry_run);
    assert_eq!(config.ladder.target_depth, 3);
    assert_eq!(config.metrics.port, 9090);
  }

  #[test]
  fn test_fill_history_limit_capped() {
    let text = format!("{MINIMAL}fill_history_limit = 5000\n");
    let err = parse_config(&text).unwrap_err();
    assert!(err.to_string().contains("fill_history_limit"));
  }
}
