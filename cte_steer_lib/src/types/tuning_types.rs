use serde::{Deserialize, Serialize};

use crate::types::{Coordinate, Gains};

/// Phase of the coordinate-descent search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchState {
    /// No trial has been scored yet
    Init,
    /// The active gain was raised by its delta
    ProbeIncreased,
    /// The active gain was lowered by its delta from the starting value
    ProbeDecreased,
}

/// Snapshot of the tuner published after every evaluation window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningReport {
    /// Completed sweeps over the tunable gains
    pub iteration: u64,
    /// Evaluation windows scored so far
    pub evaluations: u64,
    /// Mean per-sample cost of the window just scored
    pub cost: f64,
    pub best_cost: f64,
    /// Gains the next trial runs with
    pub gains: Gains,
    pub best_gains: Gains,
    pub deltas: [f64; 3],
    pub delta_sum: f64,
    pub active: Coordinate,
    pub state: SearchState,
    pub enabled: bool,
    /// Unix milliseconds
    pub timestamp: i64,
}
