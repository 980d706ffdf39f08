use std::{env, fmt, str::FromStr};

use core_sim::NegativeDistancePolicy;

const DEFAULT_MODE: RunMode = RunMode::Synthetic;
const DEFAULT_INITIAL_PRICE: f64 = 100.0;
const DEFAULT_HORIZON: f64 = 1.0;
const DEFAULT_STEP_SIZE: f64 = 1.0 / 2520.0;
const DEFAULT_VOLATILITY: f64 = 0.5;
const DEFAULT_SEED: u64 = 42;
const DEFAULT_FIXED_SPREAD: f64 = 0.05;
const DEFAULT_SPREAD_BPS: f64 = 5.0;
const DEFAULT_OUTPUT_DIR: &str = "artifacts";
const DEFAULT_SYMBOL: &str = "BTCUSDT";
const DEFAULT_INTERVAL: &str = "1m";
const DEFAULT_CANDLE_LIMIT: u32 = 1000;
const DEFAULT_CACHE_DIR: &str = "data";

pub const ENV_MODE: &str = "MM_LAB_MODE";
pub const ENV_INITIAL_PRICE: &str = "MM_LAB_INITIAL_PRICE";
pub const ENV_HORIZON: &str = "MM_LAB_HORIZON";
pub const ENV_STEP_SIZE: &str = "MM_LAB_STEP_SIZE";
pub const ENV_VOLATILITY: &str = "MM_LAB_VOLATILITY";
pub const ENV_SEED: &str = "MM_LAB_SEED";
pub const ENV_FIXED_SPREAD: &str = "MM_LAB_FIXED_SPREAD";
pub const ENV_SPREAD_BPS: &str = "MM_LAB_SPREAD_BPS";
pub const ENV_MAX_INVENTORY: &str = "MM_LAB_MAX_INVENTORY";
pub const ENV_NEGATIVE_DISTANCE: &str = "MM_LAB_NEGATIVE_DISTANCE";
pub const ENV_OUTPUT_DIR: &str = "MM_LAB_OUTPUT_DIR";
pub const ENV_SYMBOL: &str = "MM_LAB_SYMBOL";
pub const ENV_INTERVAL: &str = "MM_LAB_INTERVAL";
pub const ENV_CANDLE_LIMIT: &str = "MM_LAB_CANDLE_LIMIT";
pub const ENV_CACHE_DIR: &str = "MM_LAB_CACHE_DIR";

#[cfg(test)]
const ALL_ENV_KEYS: [&str; 15] = [
    ENV_MODE,
    ENV_INITIAL_PRICE,
    ENV_HORIZON,
    ENV_STEP_SIZE,
    ENV_VOLATILITY,
    ENV_SEED,
    ENV_FIXED_SPREAD,
    ENV_SPREAD_BPS,
    ENV_MAX_INVENTORY,
    ENV_NEGATIVE_DISTANCE,
    ENV_OUTPUT_DIR,
    ENV_SYMBOL,
    ENV_INTERVAL,
    ENV_CANDLE_LIMIT,
    ENV_CACHE_DIR,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Synthetic,
    Historical,
}

impl RunMode {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "synthetic" => Some(Self::Synthetic),
            "historical" => Some(Self::Historical),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Synthetic => "synthetic",
            Self::Historical => "historical",
        }
    }
}

fn parse_negative_distance_policy(value: &str) -> Option<NegativeDistancePolicy> {
    match value {
        "pass-through" => Some(NegativeDistancePolicy::PassThrough),
        "clamp" => Some(NegativeDistancePolicy::ClampToZero),
        "reject" => Some(NegativeDistancePolicy::Reject),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub mode: RunMode,
    pub initial_price: f64,
    pub horizon: f64,
    pub step_size: f64,
    pub volatility: f64,
    pub seed: u64,
    pub fixed_spread: f64,
    pub spread_bps: f64,
    pub max_inventory: Option<i64>,
    pub negative_distance_policy: NegativeDistancePolicy,
    pub output_dir: String,
    pub symbol: String,
    pub interval: String,
    pub candle_limit: u32,
    pub cache_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidMode,
    InvalidNegativeDistancePolicy,
    InvalidNumber { key: &'static str },
    OutOfRange { key: &'static str },
    EmptyValue { key: &'static str },
    NonUnicode { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMode => {
                write!(f, "{ENV_MODE} must be one of: synthetic, historical")
            }
            Self::InvalidNegativeDistancePolicy => {
                write!(
                    f,
                    "{ENV_NEGATIVE_DISTANCE} must be one of: pass-through, clamp, reject"
                )
            }
            Self::InvalidNumber { key } => write!(f, "{key} is not a valid number"),
            Self::OutOfRange { key } => write!(f, "{key} is outside its allowed range"),
            Self::EmptyValue { key } => write!(f, "{key} must not be empty or whitespace"),
            Self::NonUnicode { key } => write!(f, "{key} contains non-unicode data"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Reads every `MM_LAB_*` key, falling back to defaults for unset keys.
    /// Range checks here are coarse; `SimulationConfig::new` does the rest.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mode = match read_env(ENV_MODE)? {
            Some(value) => RunMode::parse(value.as_str()).ok_or(ConfigError::InvalidMode)?,
            None => DEFAULT_MODE,
        };

        let negative_distance_policy = match read_env(ENV_NEGATIVE_DISTANCE)? {
            Some(value) => parse_negative_distance_policy(value.as_str())
                .ok_or(ConfigError::InvalidNegativeDistancePolicy)?,
            None => NegativeDistancePolicy::default(),
        };

        let initial_price = parse_positive_f64_env(ENV_INITIAL_PRICE, DEFAULT_INITIAL_PRICE)?;
        let horizon = parse_positive_f64_env(ENV_HORIZON, DEFAULT_HORIZON)?;
        let step_size = parse_positive_f64_env(ENV_STEP_SIZE, DEFAULT_STEP_SIZE)?;
        let volatility = parse_env(ENV_VOLATILITY, DEFAULT_VOLATILITY)?;
        if !volatility.is_finite() || volatility < 0.0 {
            return Err(ConfigError::OutOfRange {
                key: ENV_VOLATILITY,
            });
        }
        let seed = parse_env(ENV_SEED, DEFAULT_SEED)?;

        let fixed_spread = parse_env(ENV_FIXED_SPREAD, DEFAULT_FIXED_SPREAD)?;
        if !fixed_spread.is_finite() || fixed_spread < 0.0 {
            return Err(ConfigError::OutOfRange {
                key: ENV_FIXED_SPREAD,
            });
        }
        let spread_bps = parse_env(ENV_SPREAD_BPS, DEFAULT_SPREAD_BPS)?;
        if !spread_bps.is_finite() || spread_bps < 0.0 {
            return Err(ConfigError::OutOfRange {
                key: ENV_SPREAD_BPS,
            });
        }

        let max_inventory = parse_optional_env::<i64>(ENV_MAX_INVENTORY)?;
        if max_inventory.is_some_and(|cap| cap <= 0) {
            return Err(ConfigError::OutOfRange {
                key: ENV_MAX_INVENTORY,
            });
        }

        let candle_limit = parse_env(ENV_CANDLE_LIMIT, DEFAULT_CANDLE_LIMIT)?;
        if candle_limit == 0 {
            return Err(ConfigError::OutOfRange {
                key: ENV_CANDLE_LIMIT,
            });
        }

        Ok(Self {
            mode,
            initial_price,
            horizon,
            step_size,
            volatility,
            seed,
            fixed_spread,
            spread_bps,
            max_inventory,
            negative_distance_policy,
            output_dir: parse_non_empty_env(ENV_OUTPUT_DIR, DEFAULT_OUTPUT_DIR)?,
            symbol: parse_non_empty_env(ENV_SYMBOL, DEFAULT_SYMBOL)?,
            interval: parse_non_empty_env(ENV_INTERVAL, DEFAULT_INTERVAL)?,
            candle_limit,
            cache_dir: parse_non_empty_env(ENV_CACHE_DIR, DEFAULT_CACHE_DIR)?,
        })
    }
}

/// Every value is trimmed before it is interpreted.
fn read_env(key: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(value) => Ok(Some(value.trim().to_owned())),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NonUnicode { key }),
    }
}

fn parse_optional_env<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    read_env(key)?
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidNumber { key })
        })
        .transpose()
}

fn parse_env<T: FromStr>(key: &'static str, default_value: T) -> Result<T, ConfigError> {
    Ok(parse_optional_env(key)?.unwrap_or(default_value))
}

fn parse_positive_f64_env(key: &'static str, default_value: f64) -> Result<f64, ConfigError> {
    let parsed = parse_env(key, default_value)?;
    if !parsed.is_finite() || parsed <= 0.0 {
        return Err(ConfigError::OutOfRange { key });
    }
    Ok(parsed)
}

fn parse_non_empty_env(key: &'static str, default_value: &str) -> Result<String, ConfigError> {
    match read_env(key)? {
        Some(value) => {
            if value.is_empty() {
                return Err(ConfigError::EmptyValue { key });
            }
            Ok(value)
        }
        None => Ok(default_value.to_owned()),
    }
}
