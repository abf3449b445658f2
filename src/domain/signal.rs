//! Kill-zone bias scoring.
//!
//! The bias of a window is the mean open-to-close move of the candles that
//! fall inside the session. A positive bias suggests the session tends to
//! push price up, a negative one down.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::candle::CandleWindow;

/// Body/range ratio above which a session reads as a clean trend.
pub const TRENDING_COHERENCE: Decimal = dec!(0.6);

/// Body/range ratio below which a session reads as wick-heavy chop.
pub const CHOPPY_COHERENCE: Decimal = dec!(0.3);

/// Character of the in-session price action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    Trending,
    Mixed,
    Choppy,
}

impl Regime {
    #[must_use]
    pub fn classify(coherence: Decimal) -> Self {
        if coherence > TRENDING_COHERENCE {
            Self::Trending
        } else if coherence < CHOPPY_COHERENCE {
            Self::Choppy
        } else {
            Self::Mixed
        }
    }
}

/// Stateless scorer over a labelled [`CandleWindow`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalEngine;

impl SignalEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Mean body return of in-window bars, or `None` when no bar falls in
    /// the session.
    #[must_use]
    pub fn bias(&self, window: &CandleWindow) -> Option<Decimal> {
        let (sum, count) = window
            .in_window()
            .fold((Decimal::ZERO, 0u32), |(sum, n), bar| {
                (sum + bar.body_return, n + 1)
            });

        if count == 0 {
            return None;
        }

        let bias = sum / Decimal::from(count);
        if let Some(outside) = mean(window.out_of_window().map(|b| b.body_return)) {
            debug!(in_window = %bias, out_of_window = %outside, "Session bias");
        }
        Some(bias)
    }

    /// Bias score with "no in-window data" collapsed to zero.
    ///
    /// Zero is indistinguishable from a flat market here; use [`Self::bias`]
    /// when the difference matters.
    #[must_use]
    pub fn score(&self, window: &CandleWindow) -> Decimal {
        self.bias(window).unwrap_or(Decimal::ZERO)
    }

    /// Mean |body| over mean range for in-window bars.
    ///
    /// Needs at least two in-window bars with a non-zero average range.
    #[must_use]
    pub fn coherence(&self, window: &CandleWindow) -> Option<Decimal> {
        let bars: Vec<_> = window.in_window().collect();
        if bars.len() < 2 {
            return None;
        }
        let body = mean(bars.iter().map(|b| b.body_return.abs()))?;
        let range = mean(bars.iter().map(|b| b.range))?;
        if range.is_zero() {
            return None;
        }
        Some(body / range)
    }

    /// Regime classification of [`Self::coherence`].
    #[must_use]
    pub fn regime(&self, window: &CandleWindow) -> Option<Regime> {
        self.coherence(window).map(Regime::classify)
    }
}

fn mean(values: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    let (sum, n) = values.fold((Decimal::ZERO, 0u32), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / Decimal::from(n))
}
