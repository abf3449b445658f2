use chrono::{DateTime, Duration, TimeZone, Utc};
use killzone::domain::{Candle, CandleWindow, Price, Session};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// 2025-12-16 at `hour`:00 UTC.
pub fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, 16, hour, 0, 0).unwrap()
}

/// A bar opening at `hour` on the test day with the given body and total
/// range, wicks split evenly.
pub fn candle(hour: u32, open: Price, close: Price, range: Price) -> Candle {
    let wick = (range - (close - open).abs()) / dec!(2);
    let low = open.min(close) - wick;
    Candle {
        open_time: at(0) + Duration::hours(i64::from(hour)),
        open,
        high: low + range,
        low,
        close,
        volume: dec!(1),
    }
}

/// Four consecutive in-session bars stepping by `step` from `start`, each
/// with range `range`.
pub fn session_trend(start: Price, step: Price, range: Price) -> Vec<Candle> {
    (0..4u32)
        .map(|i| {
            let open = start + step * Decimal::from(i);
            candle(14 + i, open, open + step, range)
        })
        .collect()
}

/// Flat bars whose true range is exactly `range`.
pub fn flat(hours: &[u32], price: Price, range: Price) -> Vec<Candle> {
    hours.iter().map(|&h| candle(h, price, price, range)).collect()
}

pub fn window(candles: Vec<Candle>) -> CandleWindow {
    CandleWindow::new(candles, &Session::default())
}
