use crate::fills::{FillDecision, Quote};

/// Inventory and cash for one run. Position is unbounded here; limits belong
/// to the strategy layer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ledger {
    inventory: i64,
    cash: f64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inventory(&self) -> i64 {
        self.inventory
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Books fills at `mid - bid_distance` (buy) and `mid + ask_distance`
    /// (sell). A two-sided step applies the bid first.
    pub fn apply_fills(&mut self, fills: FillDecision, mid_price: f64, quote: Quote) {
        if fills.filled_bid {
            self.inventory += 1;
            self.cash -= mid_price - quote.bid_distance;
        }
        if fills.filled_ask {
            self.inventory -= 1;
            self.cash += mid_price + quote.ask_distance;
        }
    }

    /// Mark-to-market value at the external mid-price.
    pub fn mark_to_market(&self, mid_price: f64) -> f64 {
        self.cash + self.inventory as f64 * mid_price
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::Ledger;
    use crate::fills::{FillDecision, Quote};

    const BID_ONLY: FillDecision = FillDecision {
        filled_bid: true,
        filled_ask: false,
    };
    const ASK_ONLY: FillDecision = FillDecision {
        filled_bid: false,
        filled_ask: true,
    };
    const BOTH: FillDecision = FillDecision {
        filled_bid: true,
        filled_ask: true,
    };

    #[test]
    fn starts_flat() {
        let ledger = Ledger::new();
        assert_eq!(ledger.inventory(), 0);
        assert_eq!(ledger.cash(), 0.0);
        assert_eq!(ledger.mark_to_market(100.0), 0.0);
    }

    #[test]
    fn bid_fill_buys_below_mid() {
        let mut ledger = Ledger::new();
        ledger.apply_fills(BID_ONLY, 100.0, Quote::new(0.25, 0.5));

        assert_eq!(ledger.inventory(), 1);
        assert_eq!(ledger.cash(), -99.75);
        assert_eq!(ledger.mark_to_market(100.0), 0.25);
    }

    #[test]
    fn ask_fill_sells_above_mid() {
        let mut ledger = Ledger::new();
        ledger.apply_fills(ASK_ONLY, 100.0, Quote::new(0.25, 0.5));

        assert_eq!(ledger.inventory(), -1);
        assert_eq!(ledger.cash(), 100.5);
        assert_eq!(ledger.mark_to_market(101.0), -0.5);
    }

    #[test]
    fn double_fill_captures_the_full_spread() {
        let mut ledger = Ledger::new();
        ledger.apply_fills(BOTH, 100.0, Quote::symmetric(0.05));

        assert_eq!(ledger.inventory(), 0);
        assert!((ledger.cash() - 0.1).abs() < 1e-12);
        assert!((ledger.mark_to_market(250.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn inventory_is_not_capped() {
        let mut ledger = Ledger::new();
        for _ in 0..1_000 {
            ledger.apply_fills(BID_ONLY, 10.0, Quote::symmetric(0.0));
        }

        assert_eq!(ledger.inventory(), 1_000);
        assert_eq!(ledger.mark_to_market(10.0), 0.0);
    }

    #[test]
    fn reset_clears_position_and_cash() {
        let mut ledger = Ledger::new();
        ledger.apply_fills(ASK_ONLY, 100.0, Quote::symmetric(0.1));
        ledger.reset();

        assert_eq!(ledger, Ledger::new());
    }
}
