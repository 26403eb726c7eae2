//! Backtest driver: signal engine → simulator over a complete bar series.
//!
//! The first `ma_window - 1` bars only warm the indicators; simulation (and the
//! balance series) starts on the bar after them.

use super::bar::Bar;
use super::error::{Result, TraderError};
use super::execution::{RiskConfig, Simulator};
use super::metrics::Summary;
use super::portfolio::Portfolio;
use super::signal::{SignalConfig, SignalEngine};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestConfig {
    pub signal: SignalConfig,
    pub risk: RiskConfig,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub portfolio: Portfolio,
    pub summary: Summary,
}

pub fn run_backtest(bars: &[Bar], config: &BacktestConfig) -> Result<BacktestResult> {
    if bars.is_empty() {
        return Err(TraderError::NoData);
    }

    let warmup = config.signal.warmup_bars();
    let mut engine = SignalEngine::new(config.signal.clone());
    let mut simulator = Simulator::new(config.risk.clone());

    for (i, bar) in bars.iter().enumerate() {
        let output = engine.update(bar)?;
        if i < warmup {
            continue;
        }
        if !output.signal.is_flat() {
            tracing::debug!(time = %bar.time, signal = %output.signal, "signal published");
        }
        simulator.on_bar(bar, output.signal, output.ma);
    }

    let portfolio = simulator.finish();
    let summary = Summary::compute(&portfolio);
    tracing::info!(
        bars = portfolio.records.len(),
        trades = portfolio.closed_trades.len(),
        total_signals = summary.total_signals,
        "backtest complete"
    );
    Ok(BacktestResult { portfolio, summary })
}
