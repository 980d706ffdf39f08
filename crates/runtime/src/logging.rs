#[derive(Debug, Clone, PartialEq)]
pub enum RunLogEventKind {
    RunStarted { steps: usize, replay: bool },
    QuotesRequested { bid_distance: f64, ask_distance: f64 },
    PriceAdvanced { price: f64 },
    FillsResolved { filled_bid: bool, filled_ask: bool },
    LedgerUpdated { inventory: i64, cash: f64 },
    HistoryRecorded { pnl: f64 },
    RunCompleted { final_pnl: Option<f64> },
    RunAborted { reason: String },
    ArtifactWritten { rows: usize },
}

impl RunLogEventKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::QuotesRequested { .. } => "quotes_requested",
            Self::PriceAdvanced { .. } => "price_advanced",
            Self::FillsResolved { .. } => "fills_resolved",
            Self::LedgerUpdated { .. } => "ledger_updated",
            Self::HistoryRecorded { .. } => "history_recorded",
            Self::RunCompleted { .. } => "run_completed",
            Self::RunAborted { .. } => "run_aborted",
            Self::ArtifactWritten { .. } => "artifact_written",
        }
    }

    fn is_run_level(&self) -> bool {
        matches!(
            self,
            Self::RunStarted { .. }
                | Self::RunCompleted { .. }
                | Self::RunAborted { .. }
                | Self::ArtifactWritten { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunLogEvent {
    pub step: usize,
    pub kind: RunLogEventKind,
}

impl RunLogEvent {
    pub fn new(step: usize, kind: RunLogEventKind) -> Self {
        Self { step, kind }
    }
}

pub trait RunLogWriter {
    fn write(&mut self, event: RunLogEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullRunLogWriter;

impl RunLogWriter for NullRunLogWriter {
    fn write(&mut self, _event: RunLogEvent) {}
}

#[derive(Debug, Default)]
pub struct InMemoryRunLogWriter {
    events: Vec<RunLogEvent>,
}

impl InMemoryRunLogWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[RunLogEvent] {
        &self.events
    }
}

impl RunLogWriter for InMemoryRunLogWriter {
    fn write(&mut self, event: RunLogEvent) {
        self.events.push(event);
    }
}

/// Forwards the journal to `tracing`: run-level events at info, per-step
/// stages at debug.
#[derive(Debug, Clone)]
pub struct TracingRunLogWriter {
    run_label: String,
}

impl TracingRunLogWriter {
    pub fn new(run_label: impl Into<String>) -> Self {
        Self {
            run_label: run_label.into(),
        }
    }
}

impl RunLogWriter for TracingRunLogWriter {
    fn write(&mut self, event: RunLogEvent) {
        if event.kind.is_run_level() {
            tracing::info!(
                run = %self.run_label,
                step = event.step,
                event = event.kind.label(),
                detail = ?event.kind
            );
        } else {
            tracing::debug!(
                run = %self.run_label,
                step = event.step,
                event = event.kind.label(),
                detail = ?event.kind
            );
        }
    }
}
