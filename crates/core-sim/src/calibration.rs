/// Annualised-style volatility from a sampled series: the population standard
/// deviation of log returns, scaled by `1 / sqrt(step_size)`.
///
/// Returns `None` when there are fewer than two prices, a price is not
/// strictly positive, or `step_size` is not positive.
pub fn estimate_volatility(prices: &[f64], step_size: f64) -> Option<f64> {
    if prices.len() < 2 || !step_size.is_finite() || step_size <= 0.0 {
        return None;
    }
    if prices.iter().any(|price| !price.is_finite() || *price <= 0.0) {
        return None;
    }

    let returns: Vec<f64> = prices
        .windows(2)
        .map(|pair| (pair[1] / pair[0]).ln())
        .collect();
    let count = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / count;
    let variance = returns
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / count;

    Some(variance.sqrt() / step_size.sqrt())
}
