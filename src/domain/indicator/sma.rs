//! Short moving average of closes.
//!
//! MA[i] = mean(close[i-W+1..=i]); while fewer than W bars exist the mean of
//! all available closes is used, so every bar has a defined value.

use serde::{Deserialize, Serialize};

use super::RollingWindow;
use crate::domain::bar::Bar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingAverage {
    closes: RollingWindow,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        MovingAverage {
            closes: RollingWindow::new(window),
        }
    }

    pub fn update(&mut self, close: f64) -> f64 {
        self.closes.push(close);
        self.closes.mean().unwrap_or(close)
    }

    pub fn window(&self) -> usize {
        self.closes.capacity()
    }
}

pub fn calculate_ma(bars: &[Bar], window: usize) -> Vec<f64> {
    let mut ma = MovingAverage::new(window);
    bars.iter().map(|bar| ma.update(bar.close)).collect()
}
