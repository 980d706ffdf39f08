use std::{
    collections::BTreeMap,
    fmt,
    fs::{self, File},
    io::{self, BufWriter},
    path::{Path, PathBuf},
};

use core_sim::{
    estimate_volatility, MarketImpactParameters, NegativeDistancePolicy, SimulationConfig,
};
use runtime::{HistoryCsvWriter, RunError, RunSummary, SimulationEngine, TracingRunLogWriter};
use strategy::{InventoryCap, QuoteStrategy, StrategyError, SymmetricSpread};

use crate::{
    config::{Config, RunMode},
    history_source::{FetchError, HistoricalPriceSource},
};

/// One-minute candles expressed in years.
pub const MINUTE_STEP_SIZE: f64 = 1.0 / 525_600.0;
pub const SUMMARY_FILE_NAME: &str = "summary.json";

#[derive(Debug)]
pub enum DriverError {
    Simulation(core_sim::ConfigError),
    Strategy(StrategyError),
    Fetch(FetchError),
    Run { strategy: String, error: RunError },
    EmptyHistory { strategy: String },
    Io(io::Error),
    Serialize(serde_json::Error),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simulation(err) => write!(f, "invalid simulation setup: {err}"),
            Self::Strategy(err) => write!(f, "invalid strategy setup: {err}"),
            Self::Fetch(err) => write!(f, "could not load historical prices: {err}"),
            Self::Run { strategy, error } => write!(f, "strategy {strategy}: {error}"),
            Self::EmptyHistory { strategy } => {
                write!(f, "strategy {strategy} recorded no history")
            }
            Self::Io(err) => write!(f, "artifact io failed: {err}"),
            Self::Serialize(err) => write!(f, "summary serialization failed: {err}"),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Simulation(err) => Some(err),
            Self::Strategy(err) => Some(err),
            Self::Fetch(err) => Some(err),
            Self::Run { error, .. } => Some(error),
            Self::EmptyHistory { .. } => None,
            Self::Io(err) => Some(err),
            Self::Serialize(err) => Some(err),
        }
    }
}

impl From<core_sim::ConfigError> for DriverError {
    fn from(err: core_sim::ConfigError) -> Self {
        Self::Simulation(err)
    }
}

impl From<StrategyError> for DriverError {
    fn from(err: StrategyError) -> Self {
        Self::Strategy(err)
    }
}

impl From<FetchError> for DriverError {
    fn from(err: FetchError) -> Self {
        Self::Fetch(err)
    }
}

impl From<io::Error> for DriverError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err)
    }
}

/// What every strategy in a comparison is run against.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub config: SimulationConfig,
    pub impact: MarketImpactParameters,
    /// `Some` for replay runs.
    pub prices: Option<Vec<f64>>,
    pub spread: SymmetricSpread,
}

impl Scenario {
    fn engine(&self) -> Result<SimulationEngine, core_sim::ConfigError> {
        match &self.prices {
            Some(prices) => {
                SimulationEngine::with_price_path(self.config, self.impact, prices.clone())
            }
            None => Ok(SimulationEngine::new(self.config, self.impact)),
        }
    }
}

pub fn synthetic_scenario(config: &Config) -> Result<Scenario, DriverError> {
    let simulation = SimulationConfig::new(
        config.initial_price,
        config.horizon,
        config.step_size,
        config.volatility,
        config.seed,
    )?;

    Ok(Scenario {
        config: simulation,
        impact: MarketImpactParameters::default(),
        prices: None,
        spread: SymmetricSpread::new(config.fixed_spread)?,
    })
}

/// Minute closes replayed one per step over `len × MINUTE_STEP_SIZE`.
pub fn historical_scenario(config: &Config, prices: Vec<f64>) -> Result<Scenario, DriverError> {
    let first_price = *prices.first().ok_or(core_sim::ConfigError::EmptyPricePath)?;
    let horizon = prices.len() as f64 * MINUTE_STEP_SIZE;
    let volatility = match estimate_volatility(&prices, MINUTE_STEP_SIZE) {
        Some(volatility) => volatility,
        None => {
            tracing::warn!(prices = prices.len(), "too few prices to estimate volatility");
            0.0
        }
    };
    tracing::info!(
        prices = prices.len(),
        first_price,
        volatility,
        "prepared historical replay"
    );

    let simulation =
        SimulationConfig::new(first_price, horizon, MINUTE_STEP_SIZE, volatility, config.seed)?;
    Ok(Scenario {
        config: simulation,
        impact: MarketImpactParameters::default(),
        prices: Some(prices),
        spread: SymmetricSpread::from_bps(first_price, config.spread_bps)?,
    })
}

/// The naive fixed-spread benchmark, plus its capped variant when a cap is
/// configured.
pub fn build_strategies(
    spread: SymmetricSpread,
    max_inventory: Option<i64>,
) -> Result<Vec<(String, Box<dyn QuoteStrategy>)>, DriverError> {
    let mut strategies: Vec<(String, Box<dyn QuoteStrategy>)> =
        vec![("naive".to_owned(), Box::new(spread))];
    if let Some(max_inventory) = max_inventory {
        strategies.push((
            "naive_capped".to_owned(),
            Box::new(InventoryCap::new(spread, max_inventory)?),
        ));
    }
    Ok(strategies)
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRun {
    pub name: String,
    pub history: core_sim::History,
    pub summary: RunSummary,
}

/// Each strategy gets a fresh engine, so every run sees the same seeded
/// price and fill stream.
pub fn run_strategies(
    scenario: &Scenario,
    policy: NegativeDistancePolicy,
    strategies: Vec<(String, Box<dyn QuoteStrategy>)>,
) -> Result<Vec<StrategyRun>, DriverError> {
    let mut runs = Vec::with_capacity(strategies.len());
    for (name, mut strategy) in strategies {
        let mut engine = scenario.engine()?.with_negative_distance_policy(policy);
        let mut log = TracingRunLogWriter::new(name.as_str());
        let history = match engine.run_with_log(strategy.as_mut(), &mut log) {
            Ok(history) => history,
            Err(error) => {
                tracing::error!(
                    strategy = %name,
                    step = error.step,
                    recorded_rows = error.history.len(),
                    "run aborted"
                );
                return Err(DriverError::Run {
                    strategy: name,
                    error,
                });
            }
        };
        let summary = RunSummary::from_history(&history)
            .ok_or_else(|| DriverError::EmptyHistory {
                strategy: name.clone(),
            })?;
        tracing::info!(
            strategy = %name,
            final_pnl = summary.final_pnl,
            final_inventory = summary.final_inventory,
            pnl_std = summary.pnl_std,
            "strategy finished"
        );
        runs.push(StrategyRun {
            name,
            history,
            summary,
        });
    }
    Ok(runs)
}

pub fn history_file_name(strategy: &str) -> String {
    format!("history_{strategy}.csv")
}

/// `history_{name}.csv` per strategy and one `summary.json` keyed by name.
pub fn write_artifacts(
    output_dir: &Path,
    runs: &[StrategyRun],
) -> Result<Vec<PathBuf>, DriverError> {
    fs::create_dir_all(output_dir)?;

    let mut written = Vec::with_capacity(runs.len() + 1);
    for run in runs {
        let path = output_dir.join(history_file_name(&run.name));
        let mut writer = HistoryCsvWriter::new(BufWriter::new(File::create(&path)?));
        let mut log = TracingRunLogWriter::new(run.name.as_str());
        writer.write_history_and_log(&run.history, &mut log)?;
        tracing::info!(path = %path.display(), "wrote history");
        written.push(path);
    }

    let summaries: BTreeMap<&str, &RunSummary> = runs
        .iter()
        .map(|run| (run.name.as_str(), &run.summary))
        .collect();
    let summary_path = output_dir.join(SUMMARY_FILE_NAME);
    fs::write(&summary_path, serde_json::to_string_pretty(&summaries)?)?;
    tracing::info!(path = %summary_path.display(), "wrote summary");
    written.push(summary_path);

    Ok(written)
}

pub async fn run(config: &Config) -> Result<Vec<StrategyRun>, DriverError> {
    let scenario = match config.mode {
        RunMode::Synthetic => synthetic_scenario(config)?,
        RunMode::Historical => {
            let source = HistoricalPriceSource::from_config(config);
            let prices = source.load_close_prices().await?;
            historical_scenario(config, prices)?
        }
    };

    let strategies = build_strategies(scenario.spread, config.max_inventory)?;
    let runs = run_strategies(&scenario, config.negative_distance_policy, strategies)?;
    write_artifacts(Path::new(&config.output_dir), &runs)?;
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        path::PathBuf,
        time::{SystemTime, UNIX_EPOCH},
    };

    use core_sim::{NegativeDistancePolicy, Quote};
    use runtime::HISTORY_CSV_HEADER;
    use strategy::{QuoteStrategy, SymmetricSpread};

    use super::{
        build_strategies, historical_scenario, history_file_name, run, run_strategies,
        synthetic_scenario, write_artifacts, DriverError, MINUTE_STEP_SIZE, SUMMARY_FILE_NAME,
    };
    use crate::config::{Config, RunMode};

    fn unique_dir(label: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("mm-lab-driver-{label}-{unique}"))
    }

    fn synthetic_config(output_dir: &str) -> Config {
        Config {
            mode: RunMode::Synthetic,
            initial_price: 100.0,
            horizon: 1.0,
            step_size: 0.005,
            volatility: 0.5,
            seed: 42,
            fixed_spread: 0.05,
            spread_bps: 5.0,
            max_inventory: Some(3),
            negative_distance_policy: NegativeDistancePolicy::PassThrough,
            output_dir: output_dir.to_owned(),
            symbol: "BTCUSDT".to_owned(),
            interval: "1m".to_owned(),
            candle_limit: 10,
            cache_dir: "unused".to_owned(),
        }
    }

    #[test]
    fn synthetic_scenario_follows_config() {
        let scenario = synthetic_scenario(&synthetic_config("unused")).unwrap();

        assert_eq!(scenario.config.step_count(), 200);
        assert_eq!(scenario.config.seed(), 42);
        assert_eq!(scenario.spread.distance(), 0.05);
        assert!(scenario.prices.is_none());
    }

    #[test]
    fn invalid_synthetic_setup_is_reported() {
        let mut config = synthetic_config("unused");
        config.step_size = 2.0;

        assert!(matches!(
            synthetic_scenario(&config),
            Err(DriverError::Simulation(_))
        ));
    }

    #[test]
    fn historical_scenario_uses_minute_steps_and_bps_spread() {
        let prices = vec![64_000.0, 64_010.0, 63_990.0, 64_020.0];
        let scenario = historical_scenario(&synthetic_config("unused"), prices.clone()).unwrap();

        assert_eq!(scenario.config.step_size(), MINUTE_STEP_SIZE);
        assert_eq!(scenario.config.step_count(), prices.len());
        assert_eq!(scenario.config.initial_price(), 64_000.0);
        assert!(scenario.config.volatility() > 0.0);
        assert!((scenario.spread.distance() - 32.0).abs() < 1e-9);
        assert_eq!(scenario.prices, Some(prices));
    }

    #[test]
    fn historical_scenario_needs_prices() {
        assert!(matches!(
            historical_scenario(&synthetic_config("unused"), Vec::new()),
            Err(DriverError::Simulation(core_sim::ConfigError::EmptyPricePath))
        ));
    }

    #[test]
    fn capped_variant_only_exists_with_a_cap() {
        let spread = SymmetricSpread::new(0.05).unwrap();

        let names = |strategies: Vec<(String, Box<dyn QuoteStrategy>)>| {
            strategies
                .into_iter()
                .map(|(name, _)| name)
                .collect::<Vec<_>>()
        };
        assert_eq!(names(build_strategies(spread, None).unwrap()), vec!["naive"]);
        assert_eq!(
            names(build_strategies(spread, Some(5)).unwrap()),
            vec!["naive", "naive_capped"]
        );
        assert!(matches!(
            build_strategies(spread, Some(0)),
            Err(DriverError::Strategy(_))
        ));
    }

    #[test]
    fn strategies_share_the_price_stream_and_cap_holds() {
        let config = synthetic_config("unused");
        let scenario = synthetic_scenario(&config).unwrap();
        let strategies = build_strategies(scenario.spread, config.max_inventory).unwrap();

        let runs = run_strategies(&scenario, config.negative_distance_policy, strategies).unwrap();

        assert_eq!(runs.len(), 2);
        let naive_prices = runs[0].history.column("price").unwrap();
        let capped_prices = runs[1].history.column("price").unwrap();
        assert_eq!(naive_prices, capped_prices);
        assert!(runs[1]
            .history
            .iter()
            .all(|row| row.inventory.abs() <= 3));
        assert_eq!(runs[0].summary.steps, 200);
    }

    #[test]
    fn rejected_quote_aborts_with_partial_history() {
        let scenario = synthetic_scenario(&synthetic_config("unused")).unwrap();
        let mut calls = 0;
        let strategy = move |_inventory: i64, _time_remaining: f64| {
            calls += 1;
            if calls > 3 {
                Quote::new(-0.01, 0.05)
            } else {
                Quote::symmetric(0.05)
            }
        };
        let strategies: Vec<(String, Box<dyn QuoteStrategy>)> =
            vec![("flips".to_owned(), Box::new(strategy))];

        let err =
            run_strategies(&scenario, NegativeDistancePolicy::Reject, strategies).unwrap_err();

        match err {
            DriverError::Run { strategy, error } => {
                assert_eq!(strategy, "flips");
                assert_eq!(error.step, 4);
                assert_eq!(error.history.len(), 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn writes_history_and_summary_artifacts() {
        let config = synthetic_config("unused");
        let scenario = synthetic_scenario(&config).unwrap();
        let strategies = build_strategies(scenario.spread, None).unwrap();
        let runs = run_strategies(&scenario, config.negative_distance_policy, strategies).unwrap();
        let root = unique_dir("artifacts");
        let output_dir = root.join("nested");

        let written = write_artifacts(&output_dir, &runs).unwrap();

        assert_eq!(
            written,
            vec![
                output_dir.join(history_file_name("naive")),
                output_dir.join(SUMMARY_FILE_NAME)
            ]
        );
        let csv = fs::read_to_string(&written[0]).unwrap();
        assert!(csv.starts_with(HISTORY_CSV_HEADER));
        assert_eq!(csv.lines().count(), 201);
        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&written[1]).unwrap()).unwrap();
        assert_eq!(summary["naive"]["steps"], 200);

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn synthetic_run_is_reproducible() {
        let first_dir = unique_dir("run-a");
        let second_dir = unique_dir("run-b");

        let first = run(&synthetic_config(first_dir.to_str().unwrap()))
            .await
            .unwrap();
        let second = run(&synthetic_config(second_dir.to_str().unwrap()))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(
            fs::read_to_string(first_dir.join(history_file_name("naive_capped"))).unwrap(),
            fs::read_to_string(second_dir.join(history_file_name("naive_capped"))).unwrap()
        );

        fs::remove_dir_all(&first_dir).unwrap();
        fs::remove_dir_all(&second_dir).unwrap();
    }
}
