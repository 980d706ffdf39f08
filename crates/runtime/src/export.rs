use std::io::{self, Write};

use core_sim::{History, HistoryRow};

use crate::logging::{RunLogEvent, RunLogEventKind, RunLogWriter};

pub const HISTORY_CSV_HEADER: &str = "time,price,inventory,cash,pnl\n";

/// Writes a run's history as CSV, one row per step.
pub struct HistoryCsvWriter<W: Write> {
    writer: W,
}

impl<W: Write> HistoryCsvWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        self.writer.write_all(HISTORY_CSV_HEADER.as_bytes())
    }

    pub fn append_rows(&mut self, rows: &[HistoryRow]) -> io::Result<()> {
        for row in rows {
            writeln!(
                self.writer,
                "{},{},{},{},{}",
                row.time, row.price, row.inventory, row.cash, row.pnl
            )?;
        }
        Ok(())
    }

    /// Header and rows, flushed before the artifact event is logged.
    pub fn write_history_and_log(
        &mut self,
        history: &History,
        run_log_writer: &mut dyn RunLogWriter,
    ) -> io::Result<()> {
        self.write_header()?;
        self.append_rows(history.rows())?;
        self.writer.flush()?;
        run_log_writer.write(RunLogEvent::new(
            history.len(),
            RunLogEventKind::ArtifactWritten {
                rows: history.len(),
            },
        ));
        Ok(())
    }
}
