pub mod quoting;
pub mod risk;

pub use core_sim::Quote;
pub use quoting::{QuoteStrategy, StrategyError, SymmetricSpread};
pub use risk::InventoryCap;

#[cfg(test)]
mod tests {
    use core_sim::Quote;

    use crate::quoting::{QuoteStrategy, StrategyError, SymmetricSpread};

    #[test]
    fn symmetric_spread_ignores_inventory_and_time() {
        let mut naive = SymmetricSpread::new(0.05).unwrap();

        assert_eq!(naive.quote(0, 1.0), Quote::symmetric(0.05));
        assert_eq!(naive.quote(17, 0.0), Quote::symmetric(0.05));
        assert_eq!(naive.quote(-17, 0.3), Quote::symmetric(0.05));
    }

    #[test]
    fn symmetric_spread_from_bps_scales_reference_price() {
        let naive = SymmetricSpread::from_bps(64_000.0, 5.0).unwrap();
        assert!((naive.distance() - 32.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_negative_or_non_finite_spread() {
        assert_eq!(
            SymmetricSpread::new(-0.01).unwrap_err(),
            StrategyError::InvalidSpread(-0.01)
        );
        assert!(SymmetricSpread::new(f64::NAN).is_err());
    }

    #[test]
    fn closures_implement_the_strategy_contract() {
        let mut skewed = |inventory: i64, _time_remaining: f64| {
            Quote::new(0.05 + 0.01 * inventory as f64, 0.05 - 0.01 * inventory as f64)
        };

        let quote = skewed.quote(2, 0.5);
        assert!((quote.bid_distance - 0.07).abs() < 1e-12);
        assert!((quote.ask_distance - 0.03).abs() < 1e-12);
    }

    #[test]
    fn boxed_strategies_dispatch_dynamically() {
        let mut strategies: Vec<Box<dyn QuoteStrategy>> = vec![
            Box::new(SymmetricSpread::new(0.1).unwrap()),
            Box::new(|_: i64, remaining: f64| Quote::symmetric(remaining)),
        ];

        assert_eq!(strategies[0].quote(0, 0.5), Quote::symmetric(0.1));
        assert_eq!(strategies[1].quote(0, 0.5), Quote::symmetric(0.5));
    }
}
