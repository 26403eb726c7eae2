//! When to wake up for the next bar.

use std::time::Duration;

use chrono::{NaiveDateTime, Timelike};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Sleep until one second past the next timeframe boundary.
    WallClock { timeframe_minutes: u32 },
    /// Constant pause between cycles, for replays.
    Fixed(Duration),
}

impl Schedule {
    pub fn until_next_bar(&self, now: NaiveDateTime) -> Duration {
        match *self {
            Schedule::WallClock { timeframe_minutes } => {
                Duration::from_secs(seconds_to_next_bar(now, timeframe_minutes))
            }
            Schedule::Fixed(d) => d,
        }
    }
}

/// `(tf - minute % tf) * 60 - second + 1`
pub fn seconds_to_next_bar(now: NaiveDateTime, timeframe_minutes: u32) -> u64 {
    let tf = u64::from(timeframe_minutes.max(1));
    let minute = u64::from(now.minute());
    let second = u64::from(now.second().min(59));
    (tf - minute % tf) * 60 - second + 1
}
