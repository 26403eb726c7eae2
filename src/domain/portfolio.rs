//! Simulation account state: capital, balance series, signal counters.

use chrono::NaiveDateTime;

use super::position::ClosedTrade;
use super::signal::Signal;

/// One row of simulation output, one per processed bar.
#[derive(Debug, Clone, PartialEq)]
pub struct BarRecord {
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub spread: f64,
    pub ma: f64,
    pub signal: Signal,
    /// Set on the opening bar once the position it opened is closed.
    pub profitable: Option<bool>,
    /// Stop price at which a position was stopped out on this bar.
    pub stop_loss_hit: Option<f64>,
    /// Capital plus unrealized P&L at this bar's open.
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub initial_capital: f64,
    /// Realized capital. Changes only when a position is closed.
    pub capital: f64,
    pub records: Vec<BarRecord>,
    pub closed_trades: Vec<ClosedTrade>,
    pub total_signals: usize,
    pub profitable_signals: usize,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            initial_capital,
            capital: initial_capital,
            records: Vec::new(),
            closed_trades: Vec::new(),
            total_signals: 0,
            profitable_signals: 0,
        }
    }

    pub fn record_bar(&mut self, record: BarRecord) -> usize {
        self.records.push(record);
        self.records.len() - 1
    }

    /// Book a closed trade and mark its opening bar.
    pub fn realize(&mut self, trade: ClosedTrade, open_index: usize) {
        self.capital += trade.pnl;
        let profitable = trade.pnl > 0.0;
        if profitable {
            self.profitable_signals += 1;
        }
        if let Some(record) = self.records.get_mut(open_index) {
            record.profitable = Some(profitable);
        }
        self.closed_trades.push(trade);
    }

    pub fn balances(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.balance).collect()
    }

    pub fn final_balance(&self) -> f64 {
        self.records
            .last()
            .map(|r| r.balance)
            .unwrap_or(self.initial_capital)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{Direction, ExitReason};
    use chrono::NaiveDate;

    fn time(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn record(h: u32, balance: f64) -> BarRecord {
        BarRecord {
            time: time(h),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.0,
            spread: 0.0,
            ma: 100.0,
            signal: Signal::Flat,
            profitable: None,
            stop_loss_hit: None,
            balance,
        }
    }

    fn trade(pnl: f64) -> ClosedTrade {
        ClosedTrade {
            direction: Direction::Long,
            size: 1.0,
            open_price: 100.0,
            exit_price: 100.0 + pnl,
            open_time: time(1),
            exit_time: time(2),
            pnl,
            exit: ExitReason::Signal,
        }
    }

    #[test]
    fn new_portfolio() {
        let p = Portfolio::new(10_000.0);
        assert!((p.capital - 10_000.0).abs() < f64::EPSILON);
        assert!(p.records.is_empty());
        assert_eq!(p.total_signals, 0);
        assert!((p.final_balance() - 10_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn realize_profit_marks_opening_bar() {
        let mut p = Portfolio::new(10_000.0);
        let open = p.record_bar(record(1, 10_000.0));
        p.record_bar(record(2, 10_000.0));

        p.realize(trade(50.0), open);

        assert!((p.capital - 10_050.0).abs() < f64::EPSILON);
        assert_eq!(p.profitable_signals, 1);
        assert_eq!(p.records[0].profitable, Some(true));
        assert_eq!(p.records[1].profitable, None);
        assert_eq!(p.closed_trades.len(), 1);
    }

    #[test]
    fn realize_loss_marks_unprofitable() {
        let mut p = Portfolio::new(10_000.0);
        let open = p.record_bar(record(1, 10_000.0));
        p.realize(trade(-20.0), open);

        assert!((p.capital - 9_980.0).abs() < f64::EPSILON);
        assert_eq!(p.profitable_signals, 0);
        assert_eq!(p.records[0].profitable, Some(false));
    }

    #[test]
    fn breakeven_is_not_profitable() {
        let mut p = Portfolio::new(10_000.0);
        let open = p.record_bar(record(1, 10_000.0));
        p.realize(trade(0.0), open);
        assert_eq!(p.records[0].profitable, Some(false));
    }

    #[test]
    fn balances_in_bar_order() {
        let mut p = Portfolio::new(1_000.0);
        p.record_bar(record(1, 1_000.0));
        p.record_bar(record(2, 1_010.0));
        assert_eq!(p.balances(), vec![1_000.0, 1_010.0]);
        assert!((p.final_balance() - 1_010.0).abs() < f64::EPSILON);
    }
}
