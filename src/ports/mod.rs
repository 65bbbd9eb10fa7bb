//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `MarketGateway`: Price, orders, fills and placement on the venue
//! - `CycleObserver`: Where cycle outcomes are reported

pub mod gateway;
pub mod telemetry;
