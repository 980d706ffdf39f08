use std::fmt;

use rand::Rng;

use crate::config::MarketImpactParameters;

/// Bid and ask offsets from the mid-price for a single step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub bid_distance: f64,
    pub ask_distance: f64,
}

impl Quote {
    pub fn new(bid_distance: f64, ask_distance: f64) -> Self {
        Self {
            bid_distance,
            ask_distance,
        }
    }

    pub fn symmetric(distance: f64) -> Self {
        Self::new(distance, distance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FillDecision {
    pub filled_bid: bool,
    pub filled_ask: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuoteError {
    NegativeBidDistance(f64),
    NegativeAskDistance(f64),
}

impl fmt::Display for QuoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeBidDistance(distance) => {
                write!(f, "bid distance {distance} is negative")
            }
            Self::NegativeAskDistance(distance) => {
                write!(f, "ask distance {distance} is negative")
            }
        }
    }
}

impl std::error::Error for QuoteError {}

/// What to do with a quote that sits on the wrong side of mid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegativeDistancePolicy {
    /// Feed the distance to the intensity law unchanged.
    #[default]
    PassThrough,
    ClampToZero,
    Reject,
}

impl NegativeDistancePolicy {
    pub fn apply(self, quote: Quote) -> Result<Quote, QuoteError> {
        match self {
            Self::PassThrough => Ok(quote),
            Self::ClampToZero => Ok(Quote::new(
                clamp_negative(quote.bid_distance),
                clamp_negative(quote.ask_distance),
            )),
            Self::Reject => {
                if quote.bid_distance < 0.0 {
                    return Err(QuoteError::NegativeBidDistance(quote.bid_distance));
                }
                if quote.ask_distance < 0.0 {
                    return Err(QuoteError::NegativeAskDistance(quote.ask_distance));
                }
                Ok(quote)
            }
        }
    }
}

// NaN compares false, so it passes through untouched.
fn clamp_negative(distance: f64) -> f64 {
    if distance < 0.0 {
        0.0
    } else {
        distance
    }
}

/// Poisson-arrival fill law: `P(delta) = 1 - exp(-A * exp(-k * delta) * dt)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillModel {
    impact: MarketImpactParameters,
}

impl FillModel {
    pub fn new(impact: MarketImpactParameters) -> Self {
        Self { impact }
    }

    pub fn impact(&self) -> &MarketImpactParameters {
        &self.impact
    }

    pub fn fill_probability(&self, distance: f64, step_size: f64) -> f64 {
        let intensity = self.impact.intensity(distance);
        -(-intensity * step_size).exp_m1()
    }

    /// Draws the bid uniform, then the ask uniform, from `rng`. A side fills
    /// when its draw falls below that side's fill probability.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        quote: Quote,
        step_size: f64,
        rng: &mut R,
    ) -> FillDecision {
        let prob_bid = self.fill_probability(quote.bid_distance, step_size);
        let prob_ask = self.fill_probability(quote.ask_distance, step_size);

        let bid_draw: f64 = rng.gen();
        let ask_draw: f64 = rng.gen();

        FillDecision {
            filled_bid: bid_draw < prob_bid,
            filled_ask: ask_draw < prob_ask,
        }
    }
}
