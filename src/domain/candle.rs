//! OHLCV candles and the per-window derived view used by the signal and
//! risk calculations.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::{Price, Volume};

/// A single OHLCV bar as returned by the data feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Volume,
}

impl Candle {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    #[must_use]
    pub fn true_range(&self, prev_close: Option<Price>) -> Price {
        let hl = self.high - self.low;
        match prev_close {
            Some(prev) => hl
                .max((self.high - prev).abs())
                .max((self.low - prev).abs()),
            None => hl,
        }
    }
}

/// The daily kill zone: an hour-of-day range `[start_hour, end_hour)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Session {
    #[must_use]
    pub const fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    /// Whether an hour of day falls inside the session.
    #[must_use]
    pub fn contains_hour(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }

    /// Whether a timestamp falls inside the session.
    #[must_use]
    pub fn is_active(&self, at: DateTime<Utc>) -> bool {
        self.contains_hour(at.hour())
    }

    /// The first instant after which a position opened at `opened_at` is
    /// past its session: the session end on the opening day, or on the next
    /// day when the position was opened at or after that day's end.
    #[must_use]
    pub fn deadline_for(&self, opened_at: DateTime<Utc>) -> DateTime<Utc> {
        let day = opened_at.date_naive();
        let end = if self.end_hour >= 24 {
            (day + Duration::days(1)).and_hms_opt(0, 0, 0)
        } else {
            day.and_hms_opt(self.end_hour, 0, 0)
        }
        .map(|naive| naive.and_utc())
        .unwrap_or(opened_at);

        if opened_at.hour() >= self.end_hour {
            end + Duration::days(1)
        } else {
            end
        }
    }

    /// Whether the session a position was opened in has elapsed at `now`.
    #[must_use]
    pub fn has_elapsed(&self, opened_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now >= self.deadline_for(opened_at)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(14, 18)
    }
}

/// A candle with the fields derived once per window.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub candle: Candle,
    /// Hour of `open_time` in UTC.
    pub hour_of_day: u32,
    /// high - low
    pub range: Price,
    /// close - open
    pub body_return: Price,
    pub in_window: bool,
}

/// Chronological candles for one symbol, labelled against a [`Session`].
///
/// Gaps are not detected; ordering is trusted as delivered by the feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleWindow {
    bars: Vec<Bar>,
}

impl CandleWindow {
    /// Derive per-bar fields for `candles` against `session`.
    #[must_use]
    pub fn new(candles: Vec<Candle>, session: &Session) -> Self {
        let bars = candles
            .into_iter()
            .map(|candle| {
                let hour_of_day = candle.open_time.hour();
                Bar {
                    hour_of_day,
                    range: candle.high - candle.low,
                    body_return: candle.close - candle.open,
                    in_window: session.contains_hour(hour_of_day),
                    candle,
                }
            })
            .collect();
        Self { bars }
    }

    #[must_use]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// The most recent bar.
    #[must_use]
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Close of the most recent bar.
    #[must_use]
    pub fn last_close(&self) -> Option<Price> {
        self.bars.last().map(|b| b.candle.close)
    }

    /// Bars inside the session.
    pub fn in_window(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter().filter(|b| b.in_window)
    }

    /// Bars outside the session.
    pub fn out_of_window(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter().filter(|b| !b.in_window)
    }
}
