use std::fmt;

use core_sim::Quote;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrategyError {
    InvalidSpread(f64),
    InvalidMaxInventory(i64),
}

impl fmt::Display for StrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSpread(value) => {
                write!(f, "spread distance {value} must be finite and non-negative")
            }
            Self::InvalidMaxInventory(value) => {
                write!(f, "max inventory {value} must be positive")
            }
        }
    }
}

impl std::error::Error for StrategyError {}

/// Quoting policy consulted once per step, before the price moves.
///
/// Must be defined for every reachable inventory and every
/// `time_remaining` in `[0, horizon]`.
pub trait QuoteStrategy {
    fn quote(&mut self, inventory: i64, time_remaining: f64) -> Quote;
}

impl<F> QuoteStrategy for F
where
    F: FnMut(i64, f64) -> Quote,
{
    fn quote(&mut self, inventory: i64, time_remaining: f64) -> Quote {
        self(inventory, time_remaining)
    }
}

/// Fixed symmetric spread, blind to inventory and time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetricSpread {
    distance: f64,
}

impl SymmetricSpread {
    pub fn new(distance: f64) -> Result<Self, StrategyError> {
        if !distance.is_finite() || distance < 0.0 {
            return Err(StrategyError::InvalidSpread(distance));
        }

        Ok(Self { distance })
    }

    /// Distance as a fraction of a reference price, in basis points.
    pub fn from_bps(reference_price: f64, bps: f64) -> Result<Self, StrategyError> {
        Self::new(reference_price * bps / 10_000.0)
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }
}

impl QuoteStrategy for SymmetricSpread {
    fn quote(&mut self, _inventory: i64, _time_remaining: f64) -> Quote {
        Quote::symmetric(self.distance)
    }
}
