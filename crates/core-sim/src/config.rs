use std::fmt;

const STEP_COUNT_TOLERANCE: f64 = 1e-9;

/// Upper bound on `horizon / step_size`; each step records one history row.
pub const MAX_STEP_COUNT: usize = 100_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    InvalidInitialPrice,
    InvalidHorizon,
    InvalidStepSize,
    InvalidVolatility,
    HorizonShorterThanStep,
    TooManySteps,
    InvalidIntensityScale,
    InvalidIntensityDecay,
    EmptyPricePath,
    InvalidPathPrice { index: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInitialPrice => write!(f, "initial_price must be finite and positive"),
            Self::InvalidHorizon => write!(f, "horizon must be finite and positive"),
            Self::InvalidStepSize => write!(f, "step_size must be finite and positive"),
            Self::InvalidVolatility => write!(f, "volatility must be finite and non-negative"),
            Self::HorizonShorterThanStep => {
                write!(f, "horizon must cover at least one step of step_size")
            }
            Self::TooManySteps => {
                write!(f, "horizon / step_size must not exceed {MAX_STEP_COUNT} steps")
            }
            Self::InvalidIntensityScale => {
                write!(f, "fill intensity scale (A) must be finite and positive")
            }
            Self::InvalidIntensityDecay => {
                write!(f, "fill intensity decay (k) must be finite and positive")
            }
            Self::EmptyPricePath => write!(f, "replay price path must not be empty"),
            Self::InvalidPathPrice { index } => {
                write!(f, "replay price at index {index} must be finite and positive")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parameters of one simulated horizon. Validated on construction and
/// immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    initial_price: f64,
    horizon: f64,
    step_size: f64,
    volatility: f64,
    seed: u64,
}

impl SimulationConfig {
    pub fn new(
        initial_price: f64,
        horizon: f64,
        step_size: f64,
        volatility: f64,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        if !initial_price.is_finite() || initial_price <= 0.0 {
            return Err(ConfigError::InvalidInitialPrice);
        }
        if !horizon.is_finite() || horizon <= 0.0 {
            return Err(ConfigError::InvalidHorizon);
        }
        if !step_size.is_finite() || step_size <= 0.0 {
            return Err(ConfigError::InvalidStepSize);
        }
        if !volatility.is_finite() || volatility < 0.0 {
            return Err(ConfigError::InvalidVolatility);
        }

        let steps = nudged_step_ratio(horizon, step_size);
        if !steps.is_finite() || steps > MAX_STEP_COUNT as f64 {
            return Err(ConfigError::TooManySteps);
        }
        if steps < 1.0 {
            return Err(ConfigError::HorizonShorterThanStep);
        }

        let config = Self {
            initial_price,
            horizon,
            step_size,
            volatility,
            seed,
        };

        Ok(config)
    }

    pub fn initial_price(&self) -> f64 {
        self.initial_price
    }

    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of whole steps in the horizon, `floor(horizon / step_size)`.
    ///
    /// The ratio is nudged by a relative tolerance before flooring so that
    /// e.g. `1.0 / (1.0 / 2520.0)` yields 2520 rather than 2519.
    pub fn step_count(&self) -> usize {
        nudged_step_ratio(self.horizon, self.step_size) as usize
    }

    pub fn with_initial_price(self, initial_price: f64) -> Result<Self, ConfigError> {
        Self::new(
            initial_price,
            self.horizon,
            self.step_size,
            self.volatility,
            self.seed,
        )
    }
}

fn nudged_step_ratio(horizon: f64, step_size: f64) -> f64 {
    (horizon / step_size * (1.0 + STEP_COUNT_TOLERANCE)).floor()
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_price: 100.0,
            horizon: 1.0,
            step_size: 1.0 / 2520.0,
            volatility: 0.2,
            seed: 42,
        }
    }
}

/// Arrival-intensity law `lambda(delta) = A * exp(-k * delta)` shared by the
/// fill model and any quoting model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketImpactParameters {
    fill_intensity_scale: f64,
    fill_intensity_decay: f64,
}

impl MarketImpactParameters {
    pub fn new(fill_intensity_scale: f64, fill_intensity_decay: f64) -> Result<Self, ConfigError> {
        if !fill_intensity_scale.is_finite() || fill_intensity_scale <= 0.0 {
            return Err(ConfigError::InvalidIntensityScale);
        }
        if !fill_intensity_decay.is_finite() || fill_intensity_decay <= 0.0 {
            return Err(ConfigError::InvalidIntensityDecay);
        }

        Ok(Self {
            fill_intensity_scale,
            fill_intensity_decay,
        })
    }

    pub fn fill_intensity_scale(&self) -> f64 {
        self.fill_intensity_scale
    }

    pub fn fill_intensity_decay(&self) -> f64 {
        self.fill_intensity_decay
    }

    pub fn intensity(&self, distance: f64) -> f64 {
        self.fill_intensity_scale * (-self.fill_intensity_decay * distance).exp()
    }
}

impl Default for MarketImpactParameters {
    fn default() -> Self {
        Self {
            fill_intensity_scale: 140.0,
            fill_intensity_decay: 1.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, MarketImpactParameters, SimulationConfig, MAX_STEP_COUNT};

    #[test]
    fn default_config_matches_reference_run() {
        let config = SimulationConfig::default();

        assert_eq!(config.initial_price(), 100.0);
        assert_eq!(config.horizon(), 1.0);
        assert_eq!(config.step_size(), 1.0 / 2520.0);
        assert_eq!(config.volatility(), 0.2);
        assert_eq!(config.seed(), 42);
        assert_eq!(config.step_count(), 2520);
    }

    #[test]
    fn step_count_floors_horizon_over_step_size() {
        let config = SimulationConfig::new(100.0, 1.0, 0.01, 0.2, 1).unwrap();
        assert_eq!(config.step_count(), 100);

        let config = SimulationConfig::new(100.0, 1.0, 0.3, 0.2, 1).unwrap();
        assert_eq!(config.step_count(), 3);
    }

    #[test]
    fn rejects_non_positive_step_size() {
        assert_eq!(
            SimulationConfig::new(100.0, 1.0, 0.0, 0.2, 1),
            Err(ConfigError::InvalidStepSize)
        );
        assert_eq!(
            SimulationConfig::new(100.0, 1.0, -0.01, 0.2, 1),
            Err(ConfigError::InvalidStepSize)
        );
        assert_eq!(
            SimulationConfig::new(100.0, 1.0, f64::NAN, 0.2, 1),
            Err(ConfigError::InvalidStepSize)
        );
    }

    #[test]
    fn rejects_non_positive_horizon_and_price() {
        assert_eq!(
            SimulationConfig::new(100.0, 0.0, 0.01, 0.2, 1),
            Err(ConfigError::InvalidHorizon)
        );
        assert_eq!(
            SimulationConfig::new(0.0, 1.0, 0.01, 0.2, 1),
            Err(ConfigError::InvalidInitialPrice)
        );
        assert_eq!(
            SimulationConfig::new(f64::INFINITY, 1.0, 0.01, 0.2, 1),
            Err(ConfigError::InvalidInitialPrice)
        );
    }

    #[test]
    fn rejects_negative_volatility_but_accepts_zero() {
        assert_eq!(
            SimulationConfig::new(100.0, 1.0, 0.01, -0.1, 1),
            Err(ConfigError::InvalidVolatility)
        );
        assert!(SimulationConfig::new(100.0, 1.0, 0.01, 0.0, 1).is_ok());
    }

    #[test]
    fn rejects_horizon_shorter_than_one_step() {
        assert_eq!(
            SimulationConfig::new(100.0, 0.005, 0.01, 0.2, 1),
            Err(ConfigError::HorizonShorterThanStep)
        );
    }

    #[test]
    fn rejects_step_counts_beyond_the_bound() {
        assert_eq!(
            SimulationConfig::new(100.0, 1e300, 1e-300, 0.2, 1),
            Err(ConfigError::TooManySteps)
        );
        assert_eq!(
            SimulationConfig::new(100.0, 1.0, 1e-9, 0.2, 1),
            Err(ConfigError::TooManySteps)
        );

        let at_bound = SimulationConfig::new(100.0, MAX_STEP_COUNT as f64, 1.0, 0.2, 1).unwrap();
        assert_eq!(at_bound.step_count(), MAX_STEP_COUNT);
    }

    #[test]
    fn with_initial_price_revalidates() {
        let config = SimulationConfig::default().with_initial_price(64_000.0).unwrap();
        assert_eq!(config.initial_price(), 64_000.0);
        assert_eq!(config.seed(), 42);

        assert_eq!(
            SimulationConfig::default().with_initial_price(-1.0),
            Err(ConfigError::InvalidInitialPrice)
        );
    }

    #[test]
    fn market_impact_defaults_and_validation() {
        let impact = MarketImpactParameters::default();
        assert_eq!(impact.fill_intensity_scale(), 140.0);
        assert_eq!(impact.fill_intensity_decay(), 1.5);
        assert_eq!(impact.intensity(0.0), 140.0);

        assert_eq!(
            MarketImpactParameters::new(0.0, 1.5),
            Err(ConfigError::InvalidIntensityScale)
        );
        assert_eq!(
            MarketImpactParameters::new(140.0, -1.0),
            Err(ConfigError::InvalidIntensityDecay)
        );
    }

    #[test]
    fn intensity_is_defined_for_negative_distances() {
        let impact = MarketImpactParameters::default();
        let at_negative = impact.intensity(-1.0);

        assert!(at_negative.is_finite());
        assert!(at_negative > impact.intensity(0.0));
    }
}
