//! Binance Spot REST API Adapter
//!
//! Implements `MarketGateway` against a Binance-compatible spot
//! venue. Handles request signing, throttling and error
//! classification.
//!
//! Sub-modules:
//! - `auth`: HMAC-SHA256 query signing, env credentials
//! - `client`: throttled HTTP client, one request per call
//! - `gateway`: port implementation and error mapping
//! - `types`: API request/response type definitions

pub mod auth;
pub mod client;
pub mod gateway;
pub mod types;

pub use gateway::BinanceGateway;
