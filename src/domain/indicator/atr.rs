//! Average True Range as a simple rolling mean of true ranges.
//!
//! The first bar has no previous close and therefore no true range, so ATR is
//! first defined on the bar at index `period` (0-based). Until then it is `None`.

use serde::{Deserialize, Serialize};

use super::RollingWindow;
use crate::domain::bar::Bar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageTrueRange {
    prev_close: Option<f64>,
    true_ranges: RollingWindow,
}

impl AverageTrueRange {
    pub fn new(period: usize) -> Self {
        AverageTrueRange {
            prev_close: None,
            true_ranges: RollingWindow::new(period),
        }
    }

    pub fn update(&mut self, bar: &Bar) -> Option<f64> {
        if let Some(prev_close) = self.prev_close {
            self.true_ranges.push(bar.true_range(prev_close));
        }
        self.prev_close = Some(bar.close);

        if self.true_ranges.is_full() {
            self.true_ranges.mean()
        } else {
            None
        }
    }
}

pub fn calculate_atr(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let mut atr = AverageTrueRange::new(period);
    bars.iter().map(|bar| atr.update(bar)).collect()
}
