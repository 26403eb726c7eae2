//! Live trading driver: one bar per cycle against a market feed and a venue.
//!
//! The [`session::Session`] owns the signal engine and the main loop. A
//! [`closure_watcher::ClosureWatcher`] task polls trade history on the side
//! and reports stop-outs over a channel.

pub mod closure_watcher;
pub mod dispatcher;
pub mod market_watch;
pub mod schedule;
pub mod session;
pub mod stop_manager;

use std::time::Duration;

use chrono::TimeDelta;

#[derive(Debug, Clone, PartialEq)]
pub struct LiveConfig {
    pub symbol: String,
    pub timeframe_minutes: u32,
    /// Completed bars requested per fetch.
    pub fetch_count: usize,
    /// Share of the account balance committed per order.
    pub risk_fraction: f64,
    pub retry_interval: Duration,
    /// Stale polls before the market is reported closed.
    pub stale_limit: u32,
    pub closure_poll: Duration,
    /// How far back the closure watcher looks in the venue's order history.
    pub closure_lookback: TimeDelta,
}

impl Default for LiveConfig {
    fn default() -> Self {
        LiveConfig {
            symbol: "XAUUSD".to_string(),
            timeframe_minutes: 5,
            fetch_count: 12,
            risk_fraction: 0.01,
            retry_interval: Duration::from_secs(1),
            stale_limit: 5,
            closure_poll: Duration::from_secs(1),
            closure_lookback: TimeDelta::hours(3),
        }
    }
}

impl LiveConfig {
    pub fn timeframe(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.timeframe_minutes))
    }
}
