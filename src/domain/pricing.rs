//! Tick rounding and ladder price derivation.
//!
//! Every price the controller sends to the venue passes through
//! [`TickSize::round`], so it is always an integer multiple of the
//! pair's tick. The ladder uses one scalar offset both below the
//! market (buys) and above the original fill price (paired sells).

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors from price arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    /// Tick size must be strictly positive.
    #[error("tick size must be positive, got {0}")]
    NonPositiveTick(Decimal),
}

/// How a price exactly halfway between two ticks is resolved.
///
/// Must match the venue's own price-filter rounding, otherwise
/// orders on a midpoint get rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickRounding {
    /// Banker's rounding: halves go to the even tick.
    #[default]
    HalfEven,
    /// Halves go away from zero (up, for positive prices).
    HalfUp,
}

impl TickRounding {
    fn strategy(self) -> RoundingStrategy {
        match self {
            Self::HalfEven => RoundingStrategy::MidpointNearestEven,
            Self::HalfUp => RoundingStrategy::MidpointAwayFromZero,
        }
    }
}

/// Minimum price increment of a trading pair. Always > 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSize(Decimal);

impl TickSize {
    /// Validate and wrap a raw tick size.
    pub fn new(value: Decimal) -> Result<Self, PricingError> {
        if value <= Decimal::ZERO {
            return Err(PricingError::NonPositiveTick(value));
        }
        Ok(Self(value.normalize()))
    }

    /// Raw increment.
    pub fn value(self) -> Decimal {
        self.0
    }

    /// Round `price` to the nearest multiple of this tick.
    ///
    /// Computes `round(price / tick) * tick`. Returns `None` only on
    /// decimal overflow.
    pub fn round(self, price: Decimal, mode: TickRounding) -> Option<Decimal> {
        let ticks = price
            .checked_div(self.0)?
            .round_dp_with_strategy(0, mode.strategy());
        ticks.checked_mul(self.0).map(|p| p.normalize())
    }

    /// Whether `price` is an exact multiple of this tick.
    pub fn is_aligned(self, price: Decimal) -> bool {
        price
            .checked_rem(self.0)
            .is_some_and(|rem| rem.is_zero())
    }
}

impl std::fmt::Display for TickSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-offset ladder pricing for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LadderPricing {
    tick: TickSize,
    offset: Decimal,
    rounding: TickRounding,
}

impl LadderPricing {
    pub fn new(tick: TickSize, offset: Decimal, rounding: TickRounding) -> Self {
        Self {
            tick,
            offset,
            rounding,
        }
    }

    pub fn tick(&self) -> TickSize {
        self.tick
    }

    /// Buy price for a new ladder rung: `round(market - offset)`.
    ///
    /// `None` when the result is not a positive price.
    pub fn buy_price(&self, market: Decimal) -> Option<Decimal> {
        let raw = market.checked_sub(self.offset)?;
        self.tick
            .round(raw, self.rounding)
            .filter(|p| *p > Decimal::ZERO)
    }

    /// Paired sell price for a buy fill: `round(fill + offset)`.
    ///
    /// Derived from the fill price, not the current market, so each
    /// round trip keeps the same margin.
    pub fn sell_price(&self, fill_price: Decimal) -> Option<Decimal> {
        let raw = fill_price.checked_add(self.offset)?;
        self.tick
            .round(raw, self.rounding)
            .filter(|p| *p > Decimal::ZERO)
    }
}
