//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, metrics export). Each
//! sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `api`: Binance spot REST client, signing and `MarketGateway` impl
//! - `dry_run`: gateway decorator that simulates writes
//! - `metrics`: Prometheus metrics export and health checks

pub mod api;
pub mod dry_run;
pub mod metrics;
