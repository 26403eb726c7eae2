#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use extrema_trader::domain::bar::Bar;
use extrema_trader::domain::error::TraderError;
use extrema_trader::domain::position::Direction;
use extrema_trader::ports::broker_port::{
    BrokerPort, HistoricalOrder, OpenPosition, OrderOutcome, Quote, RETCODE_DONE,
};
use extrema_trader::ports::market_port::MarketDataPort;
use extrema_trader::ports::notify_port::Notifier;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::Mutex;

pub fn t(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::minutes(5 * i as i64)
}

/// Bars with open = high = low = close and no spread, 5 minutes apart.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            time: t(i),
            open: close,
            high: close,
            low: close,
            close,
            spread: 0.0,
        })
        .collect()
}

pub fn make_bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        time: t(i),
        open,
        high,
        low,
        close,
        spread: 0.0,
    }
}

/// Falls by 1 for 15 bars, then rises by 2 for 15 bars. With a 10-bar MA the
/// only extremum is the MA minimum at bar 17, so a Buy is published at bar 20.
pub fn v_shape_closes() -> Vec<f64> {
    (0..30)
        .map(|i| {
            if i < 15 {
                100.0 - i as f64
            } else {
                86.0 + 2.0 * (i as f64 - 14.0)
            }
        })
        .collect()
}

pub const V_SHAPE_TROUGH: usize = 17;
pub const V_SHAPE_BUY: usize = 20;

pub fn bars_to_csv(bars: &[Bar]) -> String {
    let mut out = String::from("time,open,high,low,close,spread\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.time.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.spread
        ));
    }
    out
}

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Window of the last `count` bars ending at index `end` inclusive.
pub fn window(bars: &[Bar], end: usize, count: usize) -> Vec<Bar> {
    let start = (end + 1).saturating_sub(count);
    bars[start..=end].to_vec()
}

// --- Notifier ---------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.messages().into_iter().map(|(t, _)| t).collect()
    }

    pub fn count(&self, title: &str, message: &str) -> usize {
        self.messages()
            .iter()
            .filter(|(t, m)| t == title && m == message)
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, title: &str, message: &str) -> Result<(), TraderError> {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
        Ok(())
    }
}

// --- Market feed ------------------------------------------------------------

/// Serves queued responses in order; once empty, repeats the last window.
pub struct ScriptedMarket {
    responses: Mutex<VecDeque<Result<Vec<Bar>, TraderError>>>,
    last: Mutex<Vec<Bar>>,
    /// Report exhaustion once the queue is empty.
    pub finite: bool,
}

impl ScriptedMarket {
    pub fn new(responses: Vec<Result<Vec<Bar>, TraderError>>, finite: bool) -> Self {
        ScriptedMarket {
            responses: Mutex::new(responses.into()),
            last: Mutex::new(Vec::new()),
            finite,
        }
    }

    /// One window per bar, each ending at the next bar.
    pub fn stepping(bars: &[Bar], count: usize) -> Self {
        let responses = (0..bars.len()).map(|i| Ok(window(bars, i, count))).collect();
        Self::new(responses, true)
    }
}

#[async_trait]
impl MarketDataPort for ScriptedMarket {
    async fn latest_bars(&self, _count: usize) -> Result<Vec<Bar>, TraderError> {
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(bars)) => {
                *self.last.lock().unwrap() = bars.clone();
                Ok(bars)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }

    fn exhausted(&self) -> bool {
        self.finite && self.responses.lock().unwrap().is_empty()
    }
}

// --- Broker -----------------------------------------------------------------

pub struct MockBroker {
    pub balance: Option<f64>,
    pub quote: Option<Quote>,
    pub order_retcode: u32,
    pub stop_retcode: u32,
    pub fail_positions: bool,
    pub positions: Mutex<Vec<OpenPosition>>,
    pub history: Mutex<Vec<HistoricalOrder>>,
    pub calls: Mutex<Vec<String>>,
}

impl Default for MockBroker {
    fn default() -> Self {
        MockBroker {
            balance: Some(10_000.0),
            quote: Some(Quote {
                bid: 1999.8,
                ask: 2000.0,
            }),
            order_retcode: RETCODE_DONE,
            stop_retcode: RETCODE_DONE,
            fail_positions: false,
            positions: Mutex::new(Vec::new()),
            history: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockBroker {
    pub fn with_position(self, position: OpenPosition) -> Self {
        self.positions.lock().unwrap().push(position);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn open_position(ticket: u64, direction: Direction, profit: f64, stop: Option<f64>) -> OpenPosition {
    OpenPosition {
        ticket,
        symbol: "XAUUSD".to_string(),
        direction,
        volume: 0.05,
        profit,
        stop_loss: stop,
    }
}

#[async_trait]
impl BrokerPort for MockBroker {
    async fn account_balance(&self) -> Result<Option<f64>, TraderError> {
        Ok(self.balance)
    }

    async fn quote(&self, _symbol: &str) -> Result<Option<Quote>, TraderError> {
        Ok(self.quote)
    }

    async fn open_positions(&self, _symbol: &str) -> Result<Vec<OpenPosition>, TraderError> {
        if self.fail_positions {
            return Err(TraderError::Broker {
                reason: "terminal disconnected".into(),
            });
        }
        Ok(self.positions.lock().unwrap().clone())
    }

    async fn place_market_order(
        &self,
        _symbol: &str,
        direction: Direction,
        volume: f64,
    ) -> Result<OrderOutcome, TraderError> {
        self.record(format!("order {:?} {}", direction, volume));
        if self.order_retcode != RETCODE_DONE {
            return Ok(OrderOutcome::rejected(self.order_retcode));
        }
        let mut positions = self.positions.lock().unwrap();
        let ticket = 100 + positions.len() as u64;
        positions.push(open_position(ticket, direction, 0.0, None));
        Ok(OrderOutcome::done())
    }

    async fn close_position(&self, ticket: u64) -> Result<OrderOutcome, TraderError> {
        self.record(format!("close {}", ticket));
        self.positions.lock().unwrap().retain(|p| p.ticket != ticket);
        Ok(OrderOutcome::done())
    }

    async fn modify_stop_loss(
        &self,
        ticket: u64,
        stop_loss: f64,
    ) -> Result<OrderOutcome, TraderError> {
        self.record(format!("stop {} {}", ticket, stop_loss));
        if self.stop_retcode != RETCODE_DONE {
            return Ok(OrderOutcome::rejected(self.stop_retcode));
        }
        if let Some(p) = self
            .positions
            .lock()
            .unwrap()
            .iter_mut()
            .find(|p| p.ticket == ticket)
        {
            p.stop_loss = Some(stop_loss);
        }
        Ok(OrderOutcome::done())
    }

    async fn order_history(
        &self,
        _from: NaiveDateTime,
        _to: NaiveDateTime,
    ) -> Result<Vec<HistoricalOrder>, TraderError> {
        Ok(self.history.lock().unwrap().clone())
    }
}
