//! In-memory paper trading venue over a replayed bar series.
//!
//! Each `latest_bars` call completes one more bar of the replay. Market orders
//! fill at the completed bar's close adjusted by half the spread; stops are
//! checked against the completed bar's high and low and, when breached, close
//! the position at the stop and show up in the order history with reason
//! `StopLoss`. History entries carry wall-clock time so that trade-history
//! queries relative to "now" see them.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::bar::{Bar, HALF_SPREAD_DIVISOR};
use crate::domain::error::TraderError;
use crate::domain::position::Direction;
use crate::ports::broker_port::{
    BrokerPort, HistoricalOrder, OpenPosition, OrderOutcome, OrderReason, Quote,
    RETCODE_INVALID_REQUEST, RETCODE_INVALID_STOPS, RETCODE_INVALID_VOLUME,
};
use crate::ports::market_port::MarketDataPort;

/// Units per lot; 100 oz for spot gold.
pub const DEFAULT_CONTRACT_SIZE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
struct PaperPosition {
    ticket: u64,
    direction: Direction,
    volume: f64,
    open_price: f64,
    stop_loss: Option<f64>,
}

#[derive(Debug)]
struct VenueState {
    bars: Vec<Bar>,
    /// Number of bars completed so far.
    cursor: usize,
    balance: f64,
    positions: Vec<PaperPosition>,
    history: Vec<HistoricalOrder>,
    next_ticket: u64,
}

impl VenueState {
    fn ticket(&mut self) -> u64 {
        let t = self.next_ticket;
        self.next_ticket += 1;
        t
    }

    fn current_bar(&self) -> Option<&Bar> {
        self.cursor.checked_sub(1).and_then(|i| self.bars.get(i))
    }

    fn quote(&self) -> Option<Quote> {
        self.current_bar().map(|bar| {
            let half = bar.spread / HALF_SPREAD_DIVISOR;
            Quote {
                bid: bar.close - half,
                ask: bar.close + half,
            }
        })
    }
}

pub struct PaperVenue {
    symbol: String,
    contract_size: f64,
    state: Mutex<VenueState>,
}

impl PaperVenue {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>, initial_balance: f64) -> Self {
        PaperVenue {
            symbol: symbol.into(),
            contract_size: DEFAULT_CONTRACT_SIZE,
            state: Mutex::new(VenueState {
                bars,
                cursor: 0,
                balance: initial_balance,
                positions: Vec::new(),
                history: Vec::new(),
                next_ticket: 1,
            }),
        }
    }

    pub fn with_contract_size(mut self, contract_size: f64) -> Self {
        self.contract_size = contract_size;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    fn profit(&self, position: &PaperPosition, quote: Quote) -> f64 {
        let diff = match position.direction {
            Direction::Long => quote.bid - position.open_price,
            Direction::Short => position.open_price - quote.ask,
        };
        diff * position.volume * self.contract_size
    }

    fn realized(&self, position: &PaperPosition, exit_price: f64) -> f64 {
        let diff = match position.direction {
            Direction::Long => exit_price - position.open_price,
            Direction::Short => position.open_price - exit_price,
        };
        diff * position.volume * self.contract_size
    }

    /// Complete the next bar and trigger any stops it breaches.
    fn advance(&self, state: &mut VenueState) {
        if state.cursor >= state.bars.len() {
            return;
        }
        state.cursor += 1;
        let Some(bar) = state.current_bar().cloned() else {
            return;
        };

        let (stopped, open): (Vec<PaperPosition>, Vec<PaperPosition>) =
            std::mem::take(&mut state.positions)
                .into_iter()
                .partition(|p| match (p.direction, p.stop_loss) {
                    (Direction::Long, Some(sl)) => bar.low < sl,
                    (Direction::Short, Some(sl)) => bar.high > sl,
                    (_, None) => false,
                });
        state.positions = open;

        for position in stopped {
            let Some(price) = position.stop_loss else {
                continue;
            };
            let pnl = self.realized(&position, price);
            state.balance += pnl;
            let ticket = state.ticket();
            state.history.push(HistoricalOrder {
                ticket,
                position_id: position.ticket,
                direction: position.direction,
                price,
                time: Utc::now().naive_utc(),
                reason: OrderReason::StopLoss,
            });
            info!(
                position = position.ticket,
                price,
                pnl,
                bar = %bar.time,
                "paper stop triggered"
            );
        }
    }

    /// Number of replay bars completed so far.
    pub async fn completed_bars(&self) -> usize {
        self.state.lock().await.cursor
    }
}

#[async_trait]
impl MarketDataPort for PaperVenue {
    async fn latest_bars(&self, count: usize) -> Result<Vec<Bar>, TraderError> {
        let mut state = self.state.lock().await;
        self.advance(&mut state);
        let end = state.cursor;
        let start = end.saturating_sub(count);
        Ok(state.bars[start..end].to_vec())
    }

    fn exhausted(&self) -> bool {
        self.state
            .try_lock()
            .map(|s| s.cursor >= s.bars.len())
            .unwrap_or(false)
    }
}

#[async_trait]
impl BrokerPort for PaperVenue {
    async fn account_balance(&self) -> Result<Option<f64>, TraderError> {
        Ok(Some(self.state.lock().await.balance))
    }

    async fn quote(&self, symbol: &str) -> Result<Option<Quote>, TraderError> {
        if symbol != self.symbol {
            return Ok(None);
        }
        Ok(self.state.lock().await.quote())
    }

    async fn open_positions(&self, symbol: &str) -> Result<Vec<OpenPosition>, TraderError> {
        if symbol != self.symbol {
            return Ok(Vec::new());
        }
        let state = self.state.lock().await;
        let Some(quote) = state.quote() else {
            return Ok(Vec::new());
        };
        Ok(state
            .positions
            .iter()
            .map(|p| OpenPosition {
                ticket: p.ticket,
                symbol: self.symbol.clone(),
                direction: p.direction,
                volume: p.volume,
                profit: self.profit(p, quote),
                stop_loss: p.stop_loss,
            })
            .collect())
    }

    async fn place_market_order(
        &self,
        symbol: &str,
        direction: Direction,
        volume: f64,
    ) -> Result<OrderOutcome, TraderError> {
        if volume.is_nan() || volume <= 0.0 {
            return Ok(OrderOutcome::rejected(RETCODE_INVALID_VOLUME));
        }
        let mut state = self.state.lock().await;
        let quote = match state.quote() {
            Some(q) if symbol == self.symbol => q,
            _ => return Ok(OrderOutcome::rejected(RETCODE_INVALID_REQUEST)),
        };
        let price = match direction {
            Direction::Long => quote.ask,
            Direction::Short => quote.bid,
        };

        let ticket = state.ticket();
        state.positions.push(PaperPosition {
            ticket,
            direction,
            volume,
            open_price: price,
            stop_loss: None,
        });
        let order = state.ticket();
        state.history.push(HistoricalOrder {
            ticket: order,
            position_id: ticket,
            direction,
            price,
            time: Utc::now().naive_utc(),
            reason: OrderReason::Client,
        });
        debug!(ticket, ?direction, volume, price, "paper order filled");
        Ok(OrderOutcome::done())
    }

    async fn close_position(&self, ticket: u64) -> Result<OrderOutcome, TraderError> {
        let mut state = self.state.lock().await;
        let Some(quote) = state.quote() else {
            return Ok(OrderOutcome::rejected(RETCODE_INVALID_REQUEST));
        };
        let Some(index) = state.positions.iter().position(|p| p.ticket == ticket) else {
            return Ok(OrderOutcome::rejected(RETCODE_INVALID_REQUEST));
        };

        let position = state.positions.remove(index);
        let price = match position.direction {
            Direction::Long => quote.bid,
            Direction::Short => quote.ask,
        };
        state.balance += self.realized(&position, price);
        let order = state.ticket();
        state.history.push(HistoricalOrder {
            ticket: order,
            position_id: ticket,
            direction: position.direction,
            price,
            time: Utc::now().naive_utc(),
            reason: OrderReason::Client,
        });
        debug!(ticket, price, "paper position closed");
        Ok(OrderOutcome::done())
    }

    async fn modify_stop_loss(
        &self,
        ticket: u64,
        stop_loss: f64,
    ) -> Result<OrderOutcome, TraderError> {
        let mut state = self.state.lock().await;
        let Some(quote) = state.quote() else {
            return Ok(OrderOutcome::rejected(RETCODE_INVALID_REQUEST));
        };
        let Some(position) = state.positions.iter_mut().find(|p| p.ticket == ticket) else {
            return Ok(OrderOutcome::rejected(RETCODE_INVALID_REQUEST));
        };

        // A stop on the wrong side of the market would fill immediately.
        let valid = match position.direction {
            Direction::Long => stop_loss < quote.bid,
            Direction::Short => stop_loss > quote.ask,
        };
        if !valid {
            return Ok(OrderOutcome::rejected(RETCODE_INVALID_STOPS));
        }
        position.stop_loss = Some(stop_loss);
        debug!(ticket, stop_loss, "paper stop updated");
        Ok(OrderOutcome::done())
    }

    async fn order_history(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<HistoricalOrder>, TraderError> {
        let state = self.state.lock().await;
        Ok(state
            .history
            .iter()
            .filter(|o| o.time >= from && o.time <= to)
            .cloned()
            .collect())
    }
}
