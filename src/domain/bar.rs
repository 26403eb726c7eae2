//! Price bar representation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Divisor applied to the quoted spread (in points) to get the half-spread in price units.
pub const HALF_SPREAD_DIVISOR: f64 = 2.0 * 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Quoted spread in points.
    pub spread: f64,
}

impl Bar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// Effective fill price for a buy at this bar's open.
    pub fn buy_price(&self) -> f64 {
        self.open + self.spread / HALF_SPREAD_DIVISOR
    }

    /// Effective fill price for a sell at this bar's open.
    pub fn sell_price(&self) -> f64 {
        self.open - self.spread / HALF_SPREAD_DIVISOR
    }
}
