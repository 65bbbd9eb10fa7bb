//! Domain layer - Core business logic and models.
//!
//! Pure types and arithmetic for the buy ladder: the traded pair,
//! orders and fills, tick rounding, and the controller's local books.
//! No I/O here (hexagonal architecture inner ring).

pub mod books;
pub mod pricing;
pub mod trade;

// Re-export core types for convenience
pub use books::{ExecutedBuys, TrackedBuys};
pub use pricing::{LadderPricing, PricingError, TickRounding, TickSize};
pub use trade::{Fill, Order, OrderId, PairParseError, TradeSide, TradingPair};
