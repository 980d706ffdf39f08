mod calibration;
mod config;
mod fills;
mod generators;
mod history;
mod ledger;

pub use calibration::estimate_volatility;
pub use config::{ConfigError, MarketImpactParameters, SimulationConfig, MAX_STEP_COUNT};
pub use fills::{FillDecision, FillModel, NegativeDistancePolicy, Quote, QuoteError};
pub use generators::{generate_price_path, PricePath};
pub use history::{History, HistoryRow, HISTORY_COLUMNS};
pub use ledger::Ledger;
