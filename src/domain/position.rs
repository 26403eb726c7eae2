//! Open position and closed trade records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::bar::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    /// Signed units: positive long, negative short.
    pub size: f64,
    pub open_price: f64,
    pub open_time: NaiveDateTime,
    /// Index of the opening bar in the simulation's record series.
    pub open_index: usize,
    pub stop_loss: Option<f64>,
}

impl Position {
    pub fn direction(&self) -> Direction {
        if self.size < 0.0 {
            Direction::Short
        } else {
            Direction::Long
        }
    }

    pub fn is_long(&self) -> bool {
        self.direction() == Direction::Long
    }

    pub fn is_short(&self) -> bool {
        self.direction() == Direction::Short
    }

    pub fn pnl_at(&self, exit_price: f64) -> f64 {
        self.size * (exit_price - self.open_price)
    }

    /// Value at the price this position would exit at on `bar`:
    /// the sell price for a long, the buy price for a short.
    pub fn exit_price(&self, bar: &Bar) -> f64 {
        match self.direction() {
            Direction::Long => bar.sell_price(),
            Direction::Short => bar.buy_price(),
        }
    }

    pub fn unrealized_pnl(&self, bar: &Bar) -> f64 {
        self.pnl_at(self.exit_price(bar))
    }

    /// Adopt `candidate` as the stop if it tightens the current one.
    /// Returns whether the stop moved.
    pub fn trail_stop(&mut self, candidate: f64) -> bool {
        let tighter = match (self.direction(), self.stop_loss) {
            (_, None) => true,
            (Direction::Long, Some(stop)) => candidate > stop,
            (Direction::Short, Some(stop)) => candidate < stop,
        };
        if tighter {
            self.stop_loss = Some(candidate);
        }
        tighter
    }

    /// The stop price if `bar` trades through it.
    pub fn stop_hit(&self, bar: &Bar) -> Option<f64> {
        let stop = self.stop_loss?;
        let hit = match self.direction() {
            Direction::Long => bar.low < stop,
            Direction::Short => bar.high > stop,
        };
        hit.then_some(stop)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    Signal,
    StopLoss,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub direction: Direction,
    pub size: f64,
    pub open_price: f64,
    pub exit_price: f64,
    pub open_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub pnl: f64,
    pub exit: ExitReason,
}
