use serde::{Deserialize, Serialize};

pub const HISTORY_COLUMNS: [&str; 5] = ["time", "price", "inventory", "cash", "pnl"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub time: f64,
    pub price: f64,
    pub inventory: i64,
    pub cash: f64,
    pub pnl: f64,
}

impl HistoryRow {
    pub fn value(&self, column: &str) -> Option<f64> {
        match column {
            "time" => Some(self.time),
            "price" => Some(self.price),
            "inventory" => Some(self.inventory as f64),
            "cash" => Some(self.cash),
            "pnl" => Some(self.pnl),
            _ => None,
        }
    }
}

/// Append-only, chronological per-step record of a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct History {
    rows: Vec<HistoryRow>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(steps: usize) -> Self {
        Self {
            rows: Vec::with_capacity(steps),
        }
    }

    pub fn push(&mut self, row: HistoryRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[HistoryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryRow> {
        self.rows.last()
    }

    pub fn final_pnl(&self) -> Option<f64> {
        self.last().map(|row| row.pnl)
    }

    /// One named column as a vector, in step order.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        if !HISTORY_COLUMNS.contains(&name) {
            return None;
        }
        self.rows.iter().map(|row| row.value(name)).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HistoryRow> {
        self.rows.iter()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a HistoryRow;
    type IntoIter = std::slice::Iter<'a, HistoryRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl IntoIterator for History {
    type Item = HistoryRow;
    type IntoIter = std::vec::IntoIter<HistoryRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
