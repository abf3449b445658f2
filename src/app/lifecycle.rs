//! Per-symbol position lifecycle: `NONE -> OPEN -> CLOSED`.
//!
//! Opening combines the volatility gate, the session bias and the exit
//! placement into one decision. Closing applies the exit rules in a fixed
//! priority: take-profit, then stop-loss, then the session time exit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::config::StrategyConfig;
use crate::domain::{
    AtrBounds, CandleWindow, Direction, ExitReason, Position, Price, RiskSizer, SignalEngine,
};
use crate::store::PositionStore;

/// Decimal places kept on position sizes.
pub const SIZE_DP: u32 = 8;

/// Tunables for opening decisions.
#[derive(Debug, Clone)]
pub struct LifecycleParams {
    pub atr_lookback: usize,
    pub atr_bounds: AtrBounds,
    /// Bias threshold as a fraction of ATR.
    pub threshold_multiplier: Decimal,
    /// Quote amount per position; size is `notional / entry`.
    pub notional_per_trade: Decimal,
    pub min_coherence: Option<Decimal>,
}

impl Default for LifecycleParams {
    fn default() -> Self {
        Self::from(&StrategyConfig::default())
    }
}

impl From<&StrategyConfig> for LifecycleParams {
    fn from(config: &StrategyConfig) -> Self {
        Self {
            atr_lookback: config.atr_lookback,
            atr_bounds: config.atr_bounds(),
            threshold_multiplier: config.threshold_multiplier,
            notional_per_trade: config.notional_per_trade,
            min_coherence: config.min_coherence,
        }
    }
}

/// Outcome of an opening evaluation. Only `Opened` mutates the store.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenDecision {
    Opened(Position),
    AlreadyOpen,
    /// No bars to measure volatility on.
    InsufficientHistory,
    VolatilityOutOfBounds { atr: Decimal },
    /// No candle fell inside the session.
    NoSignal,
    /// Bias within `[-threshold, threshold]`.
    Neutral { bias: Decimal, threshold: Decimal },
    /// Session coherence under the configured minimum.
    Choppy { coherence: Option<Decimal> },
    /// The computed position failed validation.
    Rejected { reason: String },
}

impl OpenDecision {
    #[must_use]
    pub fn is_opened(&self) -> bool {
        matches!(self, Self::Opened(_))
    }
}

/// Outcome of an exit evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum CloseDecision {
    Closed(Position),
    Hold,
    NotOpen,
}

/// Exit reason and fill price for `position` at `price`, if any.
///
/// Take-profit and stop-loss fill at their level; the time exit fills at
/// the current price.
#[must_use]
pub fn exit_for(position: &Position, price: Price, window_elapsed: bool) -> Option<(ExitReason, Price)> {
    let tp = position.take_profit();
    let sl = position.stop_loss();
    let (tp_hit, sl_hit) = match position.direction() {
        Direction::Long => (price >= tp, price <= sl),
        Direction::Short => (price <= tp, price >= sl),
    };

    if tp_hit {
        Some((ExitReason::TakeProfit, tp))
    } else if sl_hit {
        Some((ExitReason::StopLoss, sl))
    } else if window_elapsed {
        Some((ExitReason::TimeExit, price))
    } else {
        None
    }
}

/// Drives opens and closes against a shared [`PositionStore`].
pub struct PositionLifecycleManager {
    store: Arc<PositionStore>,
    signal: SignalEngine,
    sizer: RiskSizer,
    params: LifecycleParams,
}

impl PositionLifecycleManager {
    #[must_use]
    pub fn new(store: Arc<PositionStore>, sizer: RiskSizer, params: LifecycleParams) -> Self {
        Self {
            store,
            signal: SignalEngine::new(),
            sizer,
            params,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<PositionStore> {
        &self.store
    }

    #[must_use]
    pub fn params(&self) -> &LifecycleParams {
        &self.params
    }

    /// Decide whether to open `symbol` from its recent candles, and open it
    /// if so.
    pub fn evaluate_open(&self, symbol: &str, window: &CandleWindow, now: DateTime<Utc>) -> OpenDecision {
        if self.store.is_open(symbol) {
            debug!(symbol, "Already open, skipping entry");
            return OpenDecision::AlreadyOpen;
        }

        let Some(atr) = self.sizer.average_true_range(window, self.params.atr_lookback) else {
            info!(symbol, "No history to measure volatility, standing aside");
            return OpenDecision::InsufficientHistory;
        };
        if !self.params.atr_bounds.contains(atr) {
            info!(
                symbol,
                atr = %atr,
                min = %self.params.atr_bounds.min,
                max = %self.params.atr_bounds.max,
                "ATR outside sanity bounds, standing aside"
            );
            return OpenDecision::VolatilityOutOfBounds { atr };
        }

        let Some(bias) = self.signal.bias(window) else {
            info!(symbol, "No candles inside the session, standing aside");
            return OpenDecision::NoSignal;
        };
        let threshold = atr * self.params.threshold_multiplier;

        let direction = if bias > threshold {
            Direction::Long
        } else if bias < -threshold {
            Direction::Short
        } else {
            info!(symbol, bias = %bias, threshold = %threshold, "Bias inside threshold, standing aside");
            return OpenDecision::Neutral { bias, threshold };
        };

        if let Some(min) = self.params.min_coherence {
            let coherence = self.signal.coherence(window);
            if coherence.map_or(true, |c| c < min) {
                info!(symbol, coherence = ?coherence, min = %min, "Session too choppy, standing aside");
                return OpenDecision::Choppy { coherence };
            }
        }

        let Some(entry) = window.last_close() else {
            return OpenDecision::InsufficientHistory;
        };
        let Some(size) = self
            .params
            .notional_per_trade
            .checked_div(entry)
            .filter(|_| entry > Decimal::ZERO)
            .map(|size| size.round_dp(SIZE_DP))
        else {
            warn!(symbol, entry = %entry, "Non-positive entry price, standing aside");
            return OpenDecision::Rejected {
                reason: format!("entry price must be positive, got {entry}"),
            };
        };
        let levels = self.sizer.exit_levels(symbol, entry, atr, direction);

        let position = match Position::open(
            symbol,
            direction,
            entry,
            size,
            levels.stop_loss,
            levels.take_profit,
            now,
        ) {
            Ok(position) => position,
            Err(e) => {
                warn!(symbol, error = %e, "Computed position is invalid, standing aside");
                return OpenDecision::Rejected { reason: e.to_string() };
            }
        };

        if !self.store.try_open(position.clone()) {
            return OpenDecision::AlreadyOpen;
        }
        self.store.request_snapshot();

        info!(
            symbol,
            direction = %direction,
            entry = %entry,
            atr = %atr,
            bias = %bias,
            stop_loss = %levels.stop_loss,
            take_profit = %levels.take_profit,
            "Opened position"
        );
        OpenDecision::Opened(position)
    }

    /// Close the open position for `symbol` if an exit rule fires at
    /// `current_price`.
    pub fn evaluate_close(
        &self,
        symbol: &str,
        current_price: Price,
        window_elapsed: bool,
        now: DateTime<Utc>,
    ) -> CloseDecision {
        let Some(position) = self.store.get_open(symbol) else {
            return CloseDecision::NotOpen;
        };

        let Some((reason, exit_price)) = exit_for(&position, current_price, window_elapsed) else {
            debug!(symbol, price = %current_price, "Holding position");
            return CloseDecision::Hold;
        };

        let Some(closed) = self.store.close(symbol, exit_price, reason, now) else {
            return CloseDecision::NotOpen;
        };
        self.store.request_snapshot();

        info!(
            symbol,
            reason = %reason,
            exit = %exit_price,
            pnl = ?closed.realized_pnl(),
            "Closed position"
        );
        CloseDecision::Closed(closed)
    }
}
