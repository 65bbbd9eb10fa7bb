//! Metrics and Monitoring Adapters
//!
//! Records ladder cycle outcomes as Prometheus metrics and serves
//! them, with liveness/readiness endpoints, on :9090 via axum 0.7.

pub mod health;
pub mod prometheus;

pub use self::health::HealthServer;
pub use self::prometheus::MetricsRegistry;
