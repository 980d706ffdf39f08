use std::fmt;

use core_sim::{
    ConfigError, FillDecision, FillModel, History, HistoryRow, Ledger, MarketImpactParameters,
    NegativeDistancePolicy, PricePath, Quote, QuoteError, SimulationConfig,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strategy::QuoteStrategy;

use crate::logging::{NullRunLogWriter, RunLogEvent, RunLogEventKind, RunLogWriter};

/// Rows reserved up front; longer runs grow the history as they go.
const HISTORY_CAPACITY_HINT: usize = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepError {
    HorizonExhausted,
    InvalidQuote(QuoteError),
    NonFiniteState { field: &'static str },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HorizonExhausted => write!(f, "all steps of the horizon have been taken"),
            Self::InvalidQuote(err) => write!(f, "strategy quote refused: {err}"),
            Self::NonFiniteState { field } => write!(f, "{field} became non-finite"),
        }
    }
}

impl std::error::Error for StepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidQuote(err) => Some(err),
            Self::HorizonExhausted | Self::NonFiniteState { .. } => None,
        }
    }
}

/// A run that stopped early. `history` holds every row recorded before the
/// failing step; the failing step itself is not recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct RunError {
    pub step: usize,
    pub cause: StepError,
    pub history: History,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run aborted at step {} after {} recorded rows: {}",
            self.step,
            self.history.len(),
            self.cause
        )
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub step: usize,
    pub quote: Quote,
    pub fills: FillDecision,
    pub row: HistoryRow,
}

/// Drives one horizon: quote, move the price, resolve fills, book them and
/// record a row, once per step. Owns its RNG stream; build one engine per
/// independent run.
#[derive(Debug, Clone)]
pub struct SimulationEngine {
    config: SimulationConfig,
    fill_model: FillModel,
    distance_policy: NegativeDistancePolicy,
    path: PricePath,
    ledger: Ledger,
    history: History,
    rng: ChaCha8Rng,
    current_time: f64,
    steps_taken: usize,
}

impl SimulationEngine {
    pub fn new(config: SimulationConfig, impact: MarketImpactParameters) -> Self {
        Self::from_path(config, impact, PricePath::synthetic(&config))
    }

    /// Replay mode: the first element of `prices` is the starting mid and
    /// `config.initial_price()` is ignored.
    pub fn with_price_path(
        config: SimulationConfig,
        impact: MarketImpactParameters,
        prices: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        let path = PricePath::replay(prices)?;
        Ok(Self::from_path(config, impact, path))
    }

    fn from_path(
        config: SimulationConfig,
        impact: MarketImpactParameters,
        path: PricePath,
    ) -> Self {
        Self {
            config,
            fill_model: FillModel::new(impact),
            distance_policy: NegativeDistancePolicy::default(),
            path,
            ledger: Ledger::new(),
            history: History::with_capacity(history_capacity(&config)),
            rng: ChaCha8Rng::seed_from_u64(config.seed()),
            current_time: 0.0,
            steps_taken: 0,
        }
    }

    pub fn with_negative_distance_policy(mut self, policy: NegativeDistancePolicy) -> Self {
        self.distance_policy = policy;
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn impact(&self) -> &MarketImpactParameters {
        self.fill_model.impact()
    }

    pub fn negative_distance_policy(&self) -> NegativeDistancePolicy {
        self.distance_policy
    }

    pub fn is_replay(&self) -> bool {
        self.path.is_replay()
    }

    pub fn step_count(&self) -> usize {
        self.config.step_count()
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    pub fn current_price(&self) -> f64 {
        self.path.current_price()
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn path_index(&self) -> usize {
        self.path.cursor()
    }

    pub fn inventory(&self) -> i64 {
        self.ledger.inventory()
    }

    pub fn cash(&self) -> f64 {
        self.ledger.cash()
    }

    pub fn pnl(&self) -> f64 {
        self.ledger.mark_to_market(self.current_price())
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Back to the initial state, RNG included: the next run replays the
    /// same random stream.
    pub fn reset(&mut self) {
        self.path.reset();
        self.ledger.reset();
        self.history = History::with_capacity(history_capacity(&self.config));
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed());
        self.current_time = 0.0;
        self.steps_taken = 0;
    }

    pub fn run<S: QuoteStrategy + ?Sized>(
        &mut self,
        strategy: &mut S,
    ) -> Result<History, RunError> {
        self.run_with_log(strategy, &mut NullRunLogWriter)
    }

    /// Resets, then executes every step of the horizon.
    pub fn run_with_log<S: QuoteStrategy + ?Sized>(
        &mut self,
        strategy: &mut S,
        log: &mut dyn RunLogWriter,
    ) -> Result<History, RunError> {
        self.reset();
        log.write(RunLogEvent::new(
            0,
            RunLogEventKind::RunStarted {
                steps: self.step_count(),
                replay: self.is_replay(),
            },
        ));

        while self.steps_taken < self.step_count() {
            if let Err(cause) = self.step_with_log(strategy, log) {
                let step = self.steps_taken + 1;
                log.write(RunLogEvent::new(
                    step,
                    RunLogEventKind::RunAborted {
                        reason: cause.to_string(),
                    },
                ));
                return Err(RunError {
                    step,
                    cause,
                    history: self.history.clone(),
                });
            }
        }

        log.write(RunLogEvent::new(
            self.steps_taken,
            RunLogEventKind::RunCompleted {
                final_pnl: self.history.final_pnl(),
            },
        ));
        Ok(self.history.clone())
    }

    pub fn step<S: QuoteStrategy + ?Sized>(
        &mut self,
        strategy: &mut S,
    ) -> Result<StepOutcome, StepError> {
        self.step_with_log(strategy, &mut NullRunLogWriter)
    }

    /// One transition. Quotes are taken against the pre-step state; the cash
    /// delta of any fill uses the post-step mid.
    pub fn step_with_log<S: QuoteStrategy + ?Sized>(
        &mut self,
        strategy: &mut S,
        log: &mut dyn RunLogWriter,
    ) -> Result<StepOutcome, StepError> {
        if self.steps_taken >= self.step_count() {
            return Err(StepError::HorizonExhausted);
        }
        let step = self.steps_taken + 1;
        let step_size = self.config.step_size();

        let time_remaining = self.config.horizon() - self.current_time;
        let quote = strategy.quote(self.ledger.inventory(), time_remaining);
        log.write(RunLogEvent::new(
            step,
            RunLogEventKind::QuotesRequested {
                bid_distance: quote.bid_distance,
                ask_distance: quote.ask_distance,
            },
        ));
        let quote = self
            .distance_policy
            .apply(quote)
            .map_err(StepError::InvalidQuote)?;

        let price = self.path.advance(&mut self.rng);
        self.current_time += step_size;
        log.write(RunLogEvent::new(step, RunLogEventKind::PriceAdvanced { price }));

        let fills = self.fill_model.resolve(quote, step_size, &mut self.rng);
        log.write(RunLogEvent::new(
            step,
            RunLogEventKind::FillsResolved {
                filled_bid: fills.filled_bid,
                filled_ask: fills.filled_ask,
            },
        ));

        self.ledger.apply_fills(fills, price, quote);
        log.write(RunLogEvent::new(
            step,
            RunLogEventKind::LedgerUpdated {
                inventory: self.ledger.inventory(),
                cash: self.ledger.cash(),
            },
        ));

        let row = HistoryRow {
            time: self.current_time,
            price,
            inventory: self.ledger.inventory(),
            cash: self.ledger.cash(),
            pnl: self.ledger.mark_to_market(price),
        };
        ensure_finite(&row)?;

        self.history.push(row);
        self.steps_taken = step;
        log.write(RunLogEvent::new(step, RunLogEventKind::HistoryRecorded { pnl: row.pnl }));

        Ok(StepOutcome {
            step,
            quote,
            fills,
            row,
        })
    }
}

fn history_capacity(config: &SimulationConfig) -> usize {
    config.step_count().min(HISTORY_CAPACITY_HINT)
}

fn ensure_finite(row: &HistoryRow) -> Result<(), StepError> {
    if !row.price.is_finite() {
        return Err(StepError::NonFiniteState { field: "price" });
    }
    if !row.cash.is_finite() {
        return Err(StepError::NonFiniteState { field: "cash" });
    }
    if !row.pnl.is_finite() {
        return Err(StepError::NonFiniteState { field: "pnl" });
    }
    Ok(())
}
