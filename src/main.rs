//! Ladder Bot — Entry Point
//!
//! Initializes configuration, logging and the venue gateway, then
//! runs the ladder until SIGINT/SIGTERM.
//!
//! Wiring sequence:
//! 0. Seed the environment from an optional .env file
//! 1. Load config (argv[1], else $LADDER_CONFIG, else config.toml) + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Load venue credentials from env (LADDER_API_KEY, LADDER_API_SECRET)
//! 4. Create VenueClient (HTTP + signing + throttle) and BinanceGateway
//! 5. Wrap in DryRunGateway when bot.dry_run = true
//! 6. Fetch tick size; an unknown pair is fatal
//! 7. Spawn health/metrics server on :9090 (/live, /ready, /metrics)
//! 8. Spawn LadderRunner (60s cadence, 5s cooldown on failure)
//! 9. Wait for SIGINT/SIGTERM → broadcast shutdown → join

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use ladder_bot::adapters::api::auth::{self, ApiCredentials};
use ladder_bot::adapters::api::client::{VenueClient, VenueClientConfig};
use ladder_bot::adapters::api::BinanceGateway;
use ladder_bot::adapters::dry_run::DryRunGateway;
use ladder_bot::adapters::metrics::{HealthServer, MetricsRegistry};
use ladder_bot::config::{self, AppConfig};
use ladder_bot::ports::gateway::MarketGateway;
use ladder_bot::usecases::{LadderController, LadderRunner, LadderSettings, RunSummary, RunnerTiming};

/// How long to wait for the runner to finish its in-flight cycle.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

fn config_path() -> String {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("LADDER_CONFIG").ok())
        .unwrap_or_else(|| "config.toml".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── 0. Optional .env (real environment wins) ─────────────
    let dotenv = auth::load_env_file(None);

    // ── 1. Load configuration ────────────────────────────────
    let path = config_path();
    let config = config::loader::load_config(&path)
        .with_context(|| format!("Failed to load configuration from {path}"))?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.bot.log_level)),
        )
        .json()
        .init();

    match dotenv {
        Ok(true) => info!("Loaded environment from .env"),
        Ok(false) => {}
        Err(e) => warn!("Ignoring .env file: {e:#}"),
    }

    info!(
        name = %config.bot.name,
        version = env!("CARGO_PKG_VERSION"),
        dry_run = config.bot.dry_run,
        pair = %config.ladder.pair,
        depth = config.ladder.target_depth,
        "Starting Ladder Bot"
    );

    // ── 3. Shutdown signal channel ───────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 4. Venue credentials ─────────────────────────────────
    let credentials = match ApiCredentials::from_env() {
        Ok(creds) => Some(creds),
        Err(e) if config.bot.dry_run => {
            warn!(error = %e, "No venue credentials; account reads will fail in dry-run");
            None
        }
        Err(e) => return Err(e.context("Failed to load venue credentials from env")),
    };

    // ── 5. Venue client + gateway ────────────────────────────
    let client_config = VenueClientConfig::from_api(&config.api)?;
    let client = Arc::new(
        VenueClient::new(&client_config, credentials).context("Failed to create venue client")?,
    );
    let venue = Arc::new(BinanceGateway::new(client));

    // ── 6. Metrics + health server ───────────────────────────
    let metrics = if config.metrics.enabled {
        let registry = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
        let server = HealthServer::new(Arc::clone(&registry), config.metrics.port);
        let health_shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = server.run(health_shutdown).await {
                error!(error = %e, "Health server failed");
            }
        });
        Some(registry)
    } else {
        None
    };

    // ── 7. Spawn the ladder ──────────────────────────────────
    let runner_shutdown = shutdown_tx.subscribe();
    let mut runner_handle = if config.bot.dry_run {
        warn!("Dry-run mode — market data is live but NO orders are sent");
        let gateway = Arc::new(DryRunGateway::new(venue));
        tokio::spawn(run_ladder(gateway, config.clone(), metrics, runner_shutdown))
    } else {
        tokio::spawn(run_ladder(venue, config.clone(), metrics, runner_shutdown))
    };

    info!("All tasks spawned — bot is running");

    // ── 8. Wait for SIGINT/SIGTERM (or the ladder exiting on its own) ──
    let early_exit = tokio::select! {
        () = shutdown_signal() => {
            info!("Shutdown signal received, stopping after the current cycle");
            None
        }
        res = &mut runner_handle => Some(res),
    };

    let _ = shutdown_tx.send(());

    let outcome = match early_exit {
        Some(res) => Ok(res),
        None => tokio::time::timeout(SHUTDOWN_GRACE, runner_handle).await,
    };

    match outcome {
        Ok(Ok(Ok(summary))) => info!(
            completed = summary.completed,
            failed = summary.failed,
            cancelled = summary.cancelled_on_shutdown,
            "Shutdown complete"
        ),
        Ok(Ok(Err(e))) => {
            error!(error = %e, "Ladder failed to start");
            return Err(e);
        }
        Ok(Err(e)) => error!(error = %e, "Ladder task panicked"),
        Err(_) => warn!("Ladder did not stop within the grace period"),
    }

    Ok(())
}

/// Fetch the tick size and run cycles until shutdown.
///
/// The only fatal error is failing to resolve the pair at startup.
async fn run_ladder<G: MarketGateway>(
    gateway: Arc<G>,
    config: AppConfig,
    metrics: Option<Arc<MetricsRegistry>>,
    shutdown_rx: broadcast::Receiver<()>,
) -> Result<RunSummary> {
    let settings = LadderSettings::from(&config.ladder);
    let controller = LadderController::start(gateway, settings)
        .await
        .with_context(|| format!("Cannot trade {}", config.ladder.pair))?;

    let timing = RunnerTiming {
        cycle_interval: config.ladder.cycle_interval(),
        error_cooldown: config.ladder.error_cooldown(),
    };
    let mut runner = LadderRunner::new(controller, timing)
        .cancel_on_shutdown(config.ladder.cancel_on_shutdown);
    if let Some(metrics) = metrics {
        runner = runner.with_observer(metrics);
    }

    Ok(runner.run(shutdown_rx).await)
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
