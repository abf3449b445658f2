//! Volatility estimation and exit-level placement.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::candle::CandleWindow;
use super::money::round_level;
use super::position::Direction;
use super::Price;

/// Default number of bars in the ATR average.
pub const DEFAULT_ATR_LOOKBACK: usize = 20;

/// Stop and target distances, in multiples of ATR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolatilityProfile {
    pub stop_multiplier: Decimal,
    pub target_multiplier: Decimal,
}

impl Default for VolatilityProfile {
    fn default() -> Self {
        Self {
            stop_multiplier: dec!(1.5),
            target_multiplier: dec!(3.0),
        }
    }
}

/// Per-symbol [`VolatilityProfile`]s with a fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileTable {
    #[serde(default, rename = "default")]
    pub fallback: VolatilityProfile,
    #[serde(default)]
    pub symbols: HashMap<String, VolatilityProfile>,
}

impl ProfileTable {
    /// Profile for `symbol`, or the fallback.
    #[must_use]
    pub fn get(&self, symbol: &str) -> VolatilityProfile {
        self.symbols.get(symbol).copied().unwrap_or(self.fallback)
    }

    /// Builder-style override for one symbol.
    #[must_use]
    pub fn with(mut self, symbol: impl Into<String>, profile: VolatilityProfile) -> Self {
        self.symbols.insert(symbol.into(), profile);
        self
    }
}

/// Stop-loss and take-profit for a prospective position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitLevels {
    pub stop_loss: Price,
    pub take_profit: Price,
}

/// Open interval of acceptable ATR values. Outside it the engine stands
/// aside; the endpoints themselves are outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtrBounds {
    pub min: Decimal,
    pub max: Decimal,
}

impl AtrBounds {
    #[must_use]
    pub fn contains(&self, atr: Decimal) -> bool {
        atr > self.min && atr < self.max
    }
}

impl Default for AtrBounds {
    fn default() -> Self {
        Self {
            min: dec!(0.05),
            max: dec!(100.0),
        }
    }
}

/// ATR estimation and exit placement driven by a [`ProfileTable`].
#[derive(Debug, Clone, Default)]
pub struct RiskSizer {
    profiles: ProfileTable,
}

impl RiskSizer {
    #[must_use]
    pub fn new(profiles: ProfileTable) -> Self {
        Self { profiles }
    }

    #[must_use]
    pub fn profiles(&self) -> &ProfileTable {
        &self.profiles
    }

    /// Simple mean of true range over the last `lookback` bars, as of the
    /// most recent bar.
    ///
    /// Short histories average whatever is available instead of failing;
    /// only an empty window (or a zero lookback) yields `None`.
    #[must_use]
    pub fn average_true_range(&self, window: &CandleWindow, lookback: usize) -> Option<Decimal> {
        let bars = window.bars();
        if bars.is_empty() || lookback == 0 {
            return None;
        }

        let start = bars.len().saturating_sub(lookback);
        let mut sum = Decimal::ZERO;
        for i in start..bars.len() {
            let prev_close = i.checked_sub(1).map(|p| bars[p].candle.close);
            sum += bars[i].candle.true_range(prev_close);
        }
        Some(sum / Decimal::from(bars.len() - start))
    }

    /// Stop and target `atr` multiples away from `entry_price`, using the
    /// symbol's profile. Levels are rounded to a magnitude-dependent
    /// precision.
    #[must_use]
    pub fn exit_levels(
        &self,
        symbol: &str,
        entry_price: Price,
        atr: Decimal,
        direction: Direction,
    ) -> ExitLevels {
        let profile = self.profiles.get(symbol);
        let risk = atr * profile.stop_multiplier;
        let reward = atr * profile.target_multiplier;

        let (stop_loss, take_profit) = match direction {
            Direction::Long => (entry_price - risk, entry_price + reward),
            Direction::Short => (entry_price + risk, entry_price - reward),
        };

        ExitLevels {
            stop_loss: round_level(stop_loss, entry_price),
            take_profit: round_level(take_profit, entry_price),
        }
    }
}
