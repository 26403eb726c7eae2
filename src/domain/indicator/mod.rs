//! Technical indicators over a bar series.
//!
//! Each indicator is an incremental, serializable value fed one bar at a time,
//! so batch and streaming callers produce identical numbers:
//! - `MovingAverage`: trailing mean of closes, shorter window during warm-up
//! - `AverageTrueRange`: trailing mean of true ranges, absent until the window fills
//!
//! `calculate_ma` / `calculate_atr` are whole-series conveniences built on them.

pub mod atr;
pub mod sma;

pub use atr::{calculate_atr, AverageTrueRange};
pub use sma::{calculate_ma, MovingAverage};

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Fixed-capacity window of the most recent values with a running mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        RollingWindow {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Mean of the values currently held, summed fresh on each call.
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }
}
