//! Run summary statistics.

use std::fmt;

use super::portfolio::Portfolio;

/// Percentage of signals whose position closed in profit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfitabilityRate {
    Rate(f64),
    /// No signal was ever acted on, so the rate is undefined.
    NoSignals,
}

impl ProfitabilityRate {
    pub fn from_counts(profitable: usize, total: usize) -> Self {
        if total == 0 {
            ProfitabilityRate::NoSignals
        } else {
            ProfitabilityRate::Rate(profitable as f64 / total as f64 * 100.0)
        }
    }

    pub fn as_percent(self) -> Option<f64> {
        match self {
            ProfitabilityRate::Rate(pct) => Some(pct),
            ProfitabilityRate::NoSignals => None,
        }
    }
}

impl fmt::Display for ProfitabilityRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfitabilityRate::Rate(pct) => write!(f, "{:.2}%", pct),
            ProfitabilityRate::NoSignals => write!(f, "undefined (no signals)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub final_balance: f64,
    pub total_signals: usize,
    pub profitable_signals: usize,
    pub profitability: ProfitabilityRate,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

impl Summary {
    pub fn compute(portfolio: &Portfolio) -> Self {
        let initial_capital = portfolio.initial_capital;
        let final_balance = portfolio.final_balance();

        let total_return = if initial_capital > 0.0 {
            (final_balance - initial_capital) / initial_capital
        } else {
            0.0
        };

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        for trade in &portfolio.closed_trades {
            let pnl = trade.pnl;
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            }
        }

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };

        let avg_loss = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };

        Summary {
            initial_capital,
            final_capital: portfolio.capital,
            final_balance,
            total_signals: portfolio.total_signals,
            profitable_signals: portfolio.profitable_signals,
            profitability: ProfitabilityRate::from_counts(
                portfolio.profitable_signals,
                portfolio.total_signals,
            ),
            total_return,
            max_drawdown: compute_drawdown(&portfolio.balances()),
            trades_won,
            trades_lost,
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
        }
    }
}

/// Largest peak-to-trough decline as a fraction of the peak.
fn compute_drawdown(balances: &[f64]) -> f64 {
    let Some(&first) = balances.first() else {
        return 0.0;
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &balance in balances {
        if balance > peak {
            peak = balance;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - balance) / peak);
        }
    }
    max_dd
}
