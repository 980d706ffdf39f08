use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use crate::config::{ConfigError, SimulationConfig};

/// Mid-price source for one run: either an arithmetic Brownian motion driven
/// by the engine's RNG stream, or a replay cursor over a recorded series.
#[derive(Debug, Clone, PartialEq)]
pub enum PricePath {
    Synthetic {
        initial_price: f64,
        price: f64,
        volatility: f64,
        step_size: f64,
    },
    Replay {
        prices: Vec<f64>,
        cursor: usize,
    },
}

impl PricePath {
    pub fn synthetic(config: &SimulationConfig) -> Self {
        Self::Synthetic {
            initial_price: config.initial_price(),
            price: config.initial_price(),
            volatility: config.volatility(),
            step_size: config.step_size(),
        }
    }

    pub fn replay(prices: Vec<f64>) -> Result<Self, ConfigError> {
        if prices.is_empty() {
            return Err(ConfigError::EmptyPricePath);
        }
        if let Some(index) = prices
            .iter()
            .position(|price| !price.is_finite() || *price <= 0.0)
        {
            return Err(ConfigError::InvalidPathPrice { index });
        }

        Ok(Self::Replay { prices, cursor: 0 })
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, Self::Replay { .. })
    }

    pub fn current_price(&self) -> f64 {
        match self {
            Self::Synthetic { price, .. } => *price,
            Self::Replay { prices, cursor } => prices[(*cursor).min(prices.len() - 1)],
        }
    }

    /// Position in the replay series; always zero in synthetic mode.
    pub fn cursor(&self) -> usize {
        match self {
            Self::Synthetic { .. } => 0,
            Self::Replay { cursor, .. } => *cursor,
        }
    }

    /// Moves one step forward and returns the new mid-price.
    ///
    /// Synthetic mode draws exactly one standard normal from `rng`; replay
    /// mode draws nothing and holds the last price once the series runs out.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        match self {
            Self::Synthetic {
                price,
                volatility,
                step_size,
                ..
            } => {
                let z: f64 = rng.sample(StandardNormal);
                *price += *volatility * step_size.sqrt() * z;
                *price
            }
            Self::Replay { prices, cursor } => {
                if *cursor + 1 < prices.len() {
                    *cursor += 1;
                }
                prices[*cursor]
            }
        }
    }

    pub fn reset(&mut self) {
        match self {
            Self::Synthetic {
                initial_price,
                price,
                ..
            } => *price = *initial_price,
            Self::Replay { cursor, .. } => *cursor = 0,
        }
    }
}

/// Pre-computes `steps + 1` points of an arithmetic Brownian path starting at
/// the configured initial price. Uses its own stream seeded with `seed + 1`
/// so that it never collides with an engine seeded from the same config.
pub fn generate_price_path(config: &SimulationConfig, steps: usize) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed().wrapping_add(1));
    let scale = config.volatility() * config.step_size().sqrt();

    let mut path = Vec::with_capacity(steps + 1);
    let mut price = config.initial_price();
    path.push(price);
    for _ in 0..steps {
        let z: f64 = rng.sample(StandardNormal);
        price += scale * z;
        path.push(price);
    }
    path
}
