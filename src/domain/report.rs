//! Closed-trade audit: win rate, profit factor and drawdown against a
//! starting balance.

use rust_decimal::Decimal;
use serde::Serialize;

use super::position::Position;
use super::Price;

/// Aggregate statistics over closed trades.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeReport {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Percentage of trades with positive PnL, 0 when there are none.
    pub win_rate: Decimal,
    pub gross_profit: Price,
    /// Absolute value of the summed losing PnL.
    pub gross_loss: Price,
    /// Gross profit over gross loss; `None` when nothing was lost.
    pub profit_factor: Option<Decimal>,
    pub total_pnl: Price,
    pub initial_capital: Price,
    pub balance: Price,
    pub return_pct: Decimal,
    /// How far the balance sits below the initial capital, in percent.
    pub drawdown_pct: Decimal,
}

impl TradeReport {
    /// Build a report from closed positions. Open records are ignored.
    #[must_use]
    pub fn from_closed(closed: &[Position], initial_capital: Price) -> Self {
        let pnls: Vec<Price> = closed.iter().filter_map(Position::realized_pnl).collect();

        let gross_profit: Price = pnls.iter().filter(|p| **p > Decimal::ZERO).sum();
        let gross_loss: Price = pnls
            .iter()
            .filter(|p| **p <= Decimal::ZERO)
            .sum::<Price>()
            .abs();
        let wins = pnls.iter().filter(|p| **p > Decimal::ZERO).count();
        let trades = pnls.len();
        let total_pnl = gross_profit - gross_loss;

        let win_rate = if trades == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(wins) * Decimal::ONE_HUNDRED / Decimal::from(trades)
        };
        let profit_factor = (!gross_loss.is_zero()).then(|| gross_profit / gross_loss);

        let balance = initial_capital + total_pnl;
        let (return_pct, drawdown_pct) = if initial_capital > Decimal::ZERO {
            let ret = total_pnl * Decimal::ONE_HUNDRED / initial_capital;
            (ret, (-ret).max(Decimal::ZERO))
        } else {
            (Decimal::ZERO, Decimal::ZERO)
        };

        Self {
            trades,
            wins,
            losses: trades - wins,
            win_rate,
            gross_profit,
            gross_loss,
            profit_factor,
            total_pnl,
            initial_capital,
            balance,
            return_pct,
            drawdown_pct,
        }
    }
}
