//! Exchange-agnostic domain logic: candles, signal, risk sizing, positions.

mod candle;
pub mod error;
mod money;
mod position;
mod report;
mod risk;
mod signal;

pub use candle::{Bar, Candle, CandleWindow, Session};
pub use money::{round_level, Price, Volume};
pub use position::{Direction, ExitReason, Position, PositionStatus};
pub use report::TradeReport;
pub use risk::{
    AtrBounds, ExitLevels, ProfileTable, RiskSizer, VolatilityProfile, DEFAULT_ATR_LOOKBACK,
};
pub use signal::{Regime, SignalEngine};
