//! Freshness tracking for fetched bar windows.
//!
//! A window is fresh when its newest bar is exactly one timeframe after the
//! last accepted one. Anything else, including a failed or empty fetch, is a
//! stale poll. Once `stale_limit` stale polls have accumulated the market is
//! considered closed, and the next window whose newest timestamp differs from
//! the last accepted one is taken as the reopening.

use chrono::{NaiveDateTime, TimeDelta};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Use the window. `reopened` is set when a closed notice went out before.
    Accept { reopened: bool },
    /// Poll again. `closed` is set on the poll that first reaches the stale limit.
    Retry { closed: bool },
}

#[derive(Debug, Clone)]
pub struct MarketWatch {
    timeframe: TimeDelta,
    stale_limit: u32,
    last: Option<NaiveDateTime>,
    stale_polls: u32,
    closed: bool,
}

impl MarketWatch {
    pub fn new(timeframe: TimeDelta, stale_limit: u32) -> Self {
        MarketWatch {
            timeframe,
            stale_limit: stale_limit.max(1),
            last: None,
            stale_polls: 0,
            closed: false,
        }
    }

    pub fn last_accepted(&self) -> Option<NaiveDateTime> {
        self.last
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Classify a poll by the newest timestamp it returned (`None` for no data).
    pub fn observe(&mut self, newest: Option<NaiveDateTime>) -> Freshness {
        let Some(last) = self.last else {
            if let Some(t) = newest {
                self.last = Some(t);
                return Freshness::Accept { reopened: false };
            }
            return self.stale();
        };

        match newest {
            Some(t) if t - last == self.timeframe => self.accept(t),
            Some(t) if self.stale_polls + 1 >= self.stale_limit && t != last => self.accept(t),
            _ => self.stale(),
        }
    }

    fn accept(&mut self, time: NaiveDateTime) -> Freshness {
        self.last = Some(time);
        self.stale_polls = 0;
        let reopened = std::mem::take(&mut self.closed);
        Freshness::Accept { reopened }
    }

    fn stale(&mut self) -> Freshness {
        self.stale_polls = self.stale_polls.saturating_add(1);
        let closed = self.stale_polls >= self.stale_limit && !self.closed;
        if closed {
            self.closed = true;
        }
        Freshness::Retry { closed }
    }
}
