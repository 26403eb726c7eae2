//! Signal generation: extrema of the short MA, filtered and confirmed.
//!
//! One incremental state machine serves both the backtest and the live loop.
//! For each new bar `k`:
//! 1. update MA (and ATR) with bar `k`
//! 2. classify bar `k-1` against its neighbours `k-2` and `k`
//! 3. on an extremum, shift the extrema history and build a candidate
//!    (Buy on a minimum, Sell on a maximum)
//! 4. optional ATR gate: keep the candidate only if `ATR[k-1] < threshold * close[k-1]`
//! 5. reversion filter: with two extrema known, suppress when
//!    `|close[k] - MA[k]| >= |last - second_last|`
//! 6. queue the filtered value and publish the one queued two bars ago
//!
//! The first `ma_window - 1` bars always publish Flat.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use super::bar::Bar;
use super::error::{Result, TraderError};
use super::extrema::{classify, ExtremaHistory, ExtremumKind};
use super::indicator::{AverageTrueRange, MovingAverage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    Flat,
}

impl Signal {
    /// +1 / -1 / 0
    pub fn value(self) -> i8 {
        match self {
            Signal::Buy => 1,
            Signal::Sell => -1,
            Signal::Flat => 0,
        }
    }

    pub fn is_flat(self) -> bool {
        self == Signal::Flat
    }
}

impl From<ExtremumKind> for Signal {
    fn from(kind: ExtremumKind) -> Self {
        match kind {
            ExtremumKind::Minimum => Signal::Buy,
            ExtremumKind::Maximum => Signal::Sell,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Flat => write!(f, "FLAT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub ma_window: usize,
    pub atr_period: usize,
    pub volatility_threshold: f64,
    /// Require `ATR < volatility_threshold * close` at the extremum bar.
    /// Backtests enable it by default, live trading does not.
    pub atr_gate: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig {
            ma_window: 10,
            atr_period: 14,
            volatility_threshold: 0.001,
            atr_gate: true,
        }
    }
}

impl SignalConfig {
    /// Number of leading bars that can never publish a trade signal.
    pub fn warmup_bars(&self) -> usize {
        self.ma_window.saturating_sub(1)
    }
}

/// Close and ATR of the bar currently awaiting classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct CandidateBar {
    close: f64,
    atr: Option<f64>,
}

/// Everything carried between two `update` calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalState {
    ma: MovingAverage,
    atr: AverageTrueRange,
    ma_tail: VecDeque<f64>,
    candidate: Option<CandidateBar>,
    extrema: ExtremaHistory,
    /// Published on the next bar.
    due_next: Option<Signal>,
    /// Published two bars from now.
    due_in_two: Option<Signal>,
    bars_seen: usize,
    last_time: Option<NaiveDateTime>,
}

impl SignalState {
    pub fn new(config: &SignalConfig) -> Self {
        SignalState {
            ma: MovingAverage::new(config.ma_window),
            atr: AverageTrueRange::new(config.atr_period),
            ma_tail: VecDeque::with_capacity(3),
            candidate: None,
            extrema: ExtremaHistory::default(),
            due_next: None,
            due_in_two: None,
            bars_seen: 0,
            last_time: None,
        }
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }

    pub fn last_time(&self) -> Option<NaiveDateTime> {
        self.last_time
    }

    pub fn extrema(&self) -> &ExtremaHistory {
        &self.extrema
    }

    /// MA of the bar before the most recent one.
    pub fn previous_ma(&self) -> Option<f64> {
        let n = self.ma_tail.len();
        if n >= 2 { self.ma_tail.get(n - 2).copied() } else { None }
    }
}

/// What one `update` call reports about its bar.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalOutput {
    pub time: NaiveDateTime,
    pub ma: f64,
    pub atr: Option<f64>,
    /// |close - MA| for this bar.
    pub ma_gap: f64,
    /// Classification of the previous bar, first known now.
    pub extremum: Option<ExtremumKind>,
    /// Filtered value computed this bar, queued for publication.
    pub fresh: Signal,
    /// Confirmed signal to act on at this bar.
    pub signal: Signal,
}

#[derive(Debug, Clone)]
pub struct SignalEngine {
    config: SignalConfig,
    state: SignalState,
}

impl SignalEngine {
    pub fn new(config: SignalConfig) -> Self {
        let state = SignalState::new(&config);
        SignalEngine { config, state }
    }

    /// Resume from a previously saved state.
    pub fn from_state(config: SignalConfig, state: SignalState) -> Result<Self> {
        if state.ma.window() != config.ma_window.max(1) {
            return Err(TraderError::ConfigInvalid {
                section: "strategy".into(),
                key: "ma_window".into(),
                reason: format!(
                    "saved state uses a window of {}, config asks for {}",
                    state.ma.window(),
                    config.ma_window
                ),
            });
        }
        Ok(SignalEngine { config, state })
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    pub fn state(&self) -> &SignalState {
        &self.state
    }

    pub fn into_state(self) -> SignalState {
        self.state
    }

    pub fn update(&mut self, bar: &Bar) -> Result<SignalOutput> {
        if let Some(last) = self.state.last_time {
            if bar.time <= last {
                return Err(TraderError::OutOfOrderBar {
                    time: bar.time,
                    last,
                });
            }
        }

        let state = &mut self.state;
        let atr = state.atr.update(bar);
        let ma = state.ma.update(bar.close);
        if state.ma_tail.len() == 3 {
            state.ma_tail.pop_front();
        }
        state.ma_tail.push_back(ma);
        let ma_gap = (bar.close - ma).abs();

        let extremum = if state.ma_tail.len() == 3 {
            classify(state.ma_tail[0], state.ma_tail[1], state.ma_tail[2])
        } else {
            None
        };

        let fresh = match extremum {
            None => Signal::Flat,
            Some(kind) => {
                state.extrema.push(state.ma_tail[1]);
                let passes_gate = !self.config.atr_gate
                    || state.candidate.is_some_and(|c| {
                        c.atr
                            .is_some_and(|a| a < self.config.volatility_threshold * c.close)
                    });
                let reverted = state
                    .extrema
                    .amplitude()
                    .is_some_and(|amplitude| ma_gap >= amplitude);

                if passes_gate && !reverted {
                    Signal::from(kind)
                } else {
                    Signal::Flat
                }
            }
        };

        let published = state.due_next.take().unwrap_or_default();
        state.due_next = state.due_in_two.take();
        state.due_in_two = Some(fresh);

        let index = state.bars_seen;
        state.bars_seen += 1;
        state.candidate = Some(CandidateBar {
            close: bar.close,
            atr,
        });
        state.last_time = Some(bar.time);

        let signal = if index < self.config.warmup_bars() {
            Signal::Flat
        } else {
            published
        };

        Ok(SignalOutput {
            time: bar.time,
            ma,
            atr,
            ma_gap,
            extremum,
            fresh,
            signal,
        })
    }
}

/// Run the engine over a complete series.
pub fn generate_signals(bars: &[Bar], config: &SignalConfig) -> Result<Vec<SignalOutput>> {
    let mut engine = SignalEngine::new(config.clone());
    bars.iter().map(|bar| engine.update(bar)).collect()
}

/// Feeds overlapping fetched windows into a `SignalEngine`, once per bar.
#[derive(Debug, Clone)]
pub struct StreamingDriver {
    engine: SignalEngine,
}

impl StreamingDriver {
    pub fn new(engine: SignalEngine) -> Self {
        StreamingDriver { engine }
    }

    pub fn engine(&self) -> &SignalEngine {
        &self.engine
    }

    pub fn into_engine(self) -> SignalEngine {
        self.engine
    }

    /// Process the bars of `window` newer than anything seen so far, in order.
    pub fn ingest(&mut self, window: &[Bar]) -> Result<Vec<SignalOutput>> {
        let last = self.engine.state().last_time();
        let mut fresh: Vec<&Bar> = window
            .iter()
            .filter(|bar| last.is_none_or(|t| bar.time > t))
            .collect();
        fresh.sort_by_key(|bar| bar.time);
        fresh.dedup_by_key(|bar| bar.time);

        fresh.into_iter().map(|bar| self.engine.update(bar)).collect()
    }
}
