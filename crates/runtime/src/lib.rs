pub mod engine;
pub mod export;
pub mod logging;
pub mod metrics;

pub use engine::{RunError, SimulationEngine, StepError, StepOutcome};
pub use export::{HistoryCsvWriter, HISTORY_CSV_HEADER};
pub use logging::{
    InMemoryRunLogWriter, NullRunLogWriter, RunLogEvent, RunLogEventKind, RunLogWriter,
    TracingRunLogWriter,
};
pub use metrics::RunSummary;
