//! Position and risk simulation.
//!
//! Per bar, in this order:
//! 1. record `capital + unrealized P&L` at the bar's exit-side price
//! 2. act on the published signal: close an opposite position, then open a
//!    new one if flat
//! 3. trail the stop to `MA[i-2]` while the position is in profit
//! 4. stop out at the stop price if the bar trades through it
//!
//! Fills happen at the bar open widened by half the spread
//! (`Bar::buy_price` / `Bar::sell_price`).

use super::bar::Bar;
use super::portfolio::{BarRecord, Portfolio};
use super::position::{ClosedTrade, Direction, ExitReason, Position};
use super::signal::Signal;

#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    pub initial_capital: f64,
    /// Fraction of capital committed per position before leverage.
    pub risk_fraction: f64,
    pub leverage: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            initial_capital: 10_000.0,
            risk_fraction: 0.01,
            leverage: 100.0,
        }
    }
}

/// Units to trade: (risk_fraction * capital * leverage) / price.
pub fn position_size(config: &RiskConfig, capital: f64, price: f64) -> f64 {
    (config.risk_fraction * capital * config.leverage) / price
}

#[derive(Debug, Clone)]
pub struct Simulator {
    config: RiskConfig,
    portfolio: Portfolio,
    position: Option<Position>,
}

impl Simulator {
    pub fn new(config: RiskConfig) -> Self {
        let portfolio = Portfolio::new(config.initial_capital);
        Simulator {
            config,
            portfolio,
            position: None,
        }
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn finish(self) -> Portfolio {
        self.portfolio
    }

    /// Process one bar with its published signal and MA value.
    pub fn on_bar(&mut self, bar: &Bar, signal: Signal, ma: f64) -> &BarRecord {
        let unrealized = self
            .position
            .as_ref()
            .map_or(0.0, |p| p.unrealized_pnl(bar));

        let index = self.portfolio.record_bar(BarRecord {
            time: bar.time,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            spread: bar.spread,
            ma,
            signal,
            profitable: None,
            stop_loss_hit: None,
            balance: self.portfolio.capital + unrealized,
        });

        let target = match signal {
            Signal::Buy => Some(Direction::Long),
            Signal::Sell => Some(Direction::Short),
            Signal::Flat => None,
        };
        if let Some(direction) = target {
            if self
                .position
                .as_ref()
                .is_some_and(|p| p.direction() == direction.opposite())
            {
                self.close(bar, None, ExitReason::Signal);
            }
            if self.position.is_none() {
                self.open(direction, bar, index);
                self.portfolio.total_signals += 1;
            }
        }

        self.trail_stop(bar, index);

        if let Some(stop) = self.position.as_ref().and_then(|p| p.stop_hit(bar)) {
            self.close(bar, Some(stop), ExitReason::StopLoss);
            self.portfolio.records[index].stop_loss_hit = Some(stop);
        }

        &self.portfolio.records[index]
    }

    fn open(&mut self, direction: Direction, bar: &Bar, index: usize) {
        let price = match direction {
            Direction::Long => bar.buy_price(),
            Direction::Short => bar.sell_price(),
        };
        let units = position_size(&self.config, self.portfolio.capital, price);
        let size = match direction {
            Direction::Long => units,
            Direction::Short => -units,
        };
        tracing::debug!(time = %bar.time, ?direction, size, price, "opening position");
        self.position = Some(Position {
            size,
            open_price: price,
            open_time: bar.time,
            open_index: index,
            stop_loss: None,
        });
    }

    /// Close at `exit_price`, or at the bar's exit-side fill price when `None`.
    fn close(&mut self, bar: &Bar, exit_price: Option<f64>, exit: ExitReason) {
        let Some(position) = self.position.take() else {
            return;
        };
        let exit_price = exit_price.unwrap_or_else(|| position.exit_price(bar));
        let pnl = position.pnl_at(exit_price);
        tracing::debug!(time = %bar.time, ?exit, exit_price, pnl, "closing position");

        let trade = ClosedTrade {
            direction: position.direction(),
            size: position.size,
            open_price: position.open_price,
            exit_price,
            open_time: position.open_time,
            exit_time: bar.time,
            pnl,
            exit,
        };
        self.portfolio.realize(trade, position.open_index);
    }

    fn trail_stop(&mut self, bar: &Bar, index: usize) {
        if index < 2 {
            return;
        }
        let candidate = self.portfolio.records[index - 2].ma;
        if let Some(position) = self.position.as_mut() {
            if position.unrealized_pnl(bar) > 0.0 && position.trail_stop(candidate) {
                tracing::trace!(time = %bar.time, stop = candidate, "stop trailed");
            }
        }
    }
}
