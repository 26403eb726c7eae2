//! Trading venue and account port trait.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::domain::error::TraderError;
use crate::domain::position::Direction;

/// Venue return code for a completed request.
pub const RETCODE_DONE: u32 = 10009;
/// Venue return code for a malformed request (unknown symbol or position).
pub const RETCODE_INVALID_REQUEST: u32 = 10013;
/// Venue return code for a rejected volume.
pub const RETCODE_INVALID_VOLUME: u32 = 10014;
/// Venue return code for an invalid stop level.
pub const RETCODE_INVALID_STOPS: u32 = 10016;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub ticket: u64,
    pub symbol: String,
    pub direction: Direction,
    pub volume: f64,
    /// Unrealized profit in account currency.
    pub profit: f64,
    pub stop_loss: Option<f64>,
}

/// Result of any request sent to the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderOutcome {
    pub retcode: u32,
}

impl OrderOutcome {
    pub fn done() -> Self {
        OrderOutcome {
            retcode: RETCODE_DONE,
        }
    }

    pub fn rejected(retcode: u32) -> Self {
        OrderOutcome { retcode }
    }

    pub fn is_done(&self) -> bool {
        self.retcode == RETCODE_DONE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderReason {
    Client,
    StopLoss,
    Other,
}

/// An order as reported by the venue's trade history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalOrder {
    pub ticket: u64,
    pub position_id: u64,
    /// Side of the position the order belonged to.
    pub direction: Direction,
    pub price: f64,
    pub time: NaiveDateTime,
    pub reason: OrderReason,
}

#[async_trait]
pub trait BrokerPort: Send + Sync {
    async fn account_balance(&self) -> Result<Option<f64>, TraderError>;

    async fn quote(&self, symbol: &str) -> Result<Option<Quote>, TraderError>;

    async fn open_positions(&self, symbol: &str) -> Result<Vec<OpenPosition>, TraderError>;

    async fn place_market_order(
        &self,
        symbol: &str,
        direction: Direction,
        volume: f64,
    ) -> Result<OrderOutcome, TraderError>;

    async fn close_position(&self, ticket: u64) -> Result<OrderOutcome, TraderError>;

    async fn modify_stop_loss(&self, ticket: u64, stop_loss: f64)
        -> Result<OrderOutcome, TraderError>;

    async fn order_history(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<HistoricalOrder>, TraderError>;
}
