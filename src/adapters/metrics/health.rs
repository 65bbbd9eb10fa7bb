//! Health Check Server - Liveness, Readiness and Metrics
//!
//! Exposes /live, /ready and /metrics via axum 0.7 for Docker
//! health checks and Prometheus scraping. Readiness follows the
//! outcome of the most recent ladder cycle.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::sync::broadcast;
use tracing::{error, info, instrument};

use super::prometheus::MetricsRegistry;

/// Axum-based health and metrics HTTP server.
pub struct HealthServer {
    /// Metrics and readiness state shared with the runner.
    metrics: Arc<MetricsRegistry>,
    /// Bind port (default 9090 from config).
    port: u16,
}

impl HealthServer {
    /// Create a new health server.
    pub fn new(metrics: Arc<MetricsRegistry>, port: u16) -> Self {
        Self { metrics, port }
    }

    /// Serve until the shutdown signal fires.
    #[instrument(skip(self, shutdown_rx), fields(port = self.port))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .route("/metrics", get(Self::metrics))
            .with_state(Arc::clone(&self.metrics));

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(address = %addr, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Liveness: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// Readiness: 200 only while cycles are completing.
    async fn readiness(State(metrics): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
        if metrics.is_ready() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }

    async fn metrics(State(metrics): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
        match metrics.encode() {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => {
                error!(error = %e, "Failed to encode metrics");
                (StatusCode::INTERNAL_SERVER_ERROR, String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::telemetry::CycleObserver;
    use crate::usecases::ladder_controller::CycleReport;

    #[tokio::test]
    async fn test_readiness_follows_cycles() {
        let metrics = Arc::new(MetricsRegistry::new().unwrap());

        let resp = HealthServer::readiness(State(Arc::clone(&metrics)))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        metrics.cycle_completed(&CycleReport::default());
        let resp = HealthServer::readiness(State(Arc::clone(&metrics)))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_liveness_and_metrics_ok() {
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        assert_eq!(
            HealthServer::liveness().await.into_response().status(),
            StatusCode::OK
        );
        assert_eq!(
            HealthServer::metrics(State(metrics))
                .await
                .into_response()
                .status(),
            StatusCode::OK
        );
    }
}
