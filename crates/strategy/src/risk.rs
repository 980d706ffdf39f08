use core_sim::Quote;

use crate::quoting::{QuoteStrategy, StrategyError};

/// Bounded-inventory overlay: once the position reaches `max_inventory` on
/// either side, the quote that would extend it is withdrawn (infinite
/// distance, zero fill probability).
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryCap<S> {
    inner: S,
    max_inventory: i64,
}

impl<S: QuoteStrategy> InventoryCap<S> {
    pub fn new(inner: S, max_inventory: i64) -> Result<Self, StrategyError> {
        if max_inventory <= 0 {
            return Err(StrategyError::InvalidMaxInventory(max_inventory));
        }

        Ok(Self {
            inner,
            max_inventory,
        })
    }

    pub fn max_inventory(&self) -> i64 {
        self.max_inventory
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: QuoteStrategy> QuoteStrategy for InventoryCap<S> {
    fn quote(&mut self, inventory: i64, time_remaining: f64) -> Quote {
        let mut quote = self.inner.quote(inventory, time_remaining);
        if inventory >= self.max_inventory {
            quote.bid_distance = f64::INFINITY;
        }
        if inventory <= -self.max_inventory {
            quote.ask_distance = f64::INFINITY;
        }
        quote
    }
}
