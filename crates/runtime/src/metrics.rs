use std::collections::BTreeMap;

use core_sim::History;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub steps: usize,
    pub final_pnl: f64,
    pub final_inventory: i64,
    pub min_inventory: i64,
    pub max_inventory: i64,
    pub mean_abs_inventory: f64,
    pub pnl_std: f64,
    /// Steps spent at each inventory level.
    pub inventory_histogram: BTreeMap<i64, usize>,
}

impl RunSummary {
    pub fn from_history(history: &History) -> Option<Self> {
        let last = history.last()?;
        let steps = history.len();
        let count = steps as f64;

        let mut min_inventory = i64::MAX;
        let mut max_inventory = i64::MIN;
        let mut abs_inventory_sum = 0.0;
        let mut pnl_sum = 0.0;
        let mut inventory_histogram = BTreeMap::new();
        for row in history {
            min_inventory = min_inventory.min(row.inventory);
            max_inventory = max_inventory.max(row.inventory);
            abs_inventory_sum += row.inventory.unsigned_abs() as f64;
            pnl_sum += row.pnl;
            *inventory_histogram.entry(row.inventory).or_insert(0) += 1;
        }

        let pnl_mean = pnl_sum / count;
        let pnl_variance = history
            .iter()
            .map(|row| (row.pnl - pnl_mean).powi(2))
            .sum::<f64>()
            / count;

        Some(Self {
            steps,
            final_pnl: last.pnl,
            final_inventory: last.inventory,
            min_inventory,
            max_inventory,
            mean_abs_inventory: abs_inventory_sum / count,
            pnl_std: pnl_variance.sqrt(),
            inventory_histogram,
        })
    }
}
