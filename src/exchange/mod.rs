//! Market data sources.
//!
//! Defines the read-only [`MarketData`] port and the Kraken REST adapter
//! that implements it.

mod kraken;
mod traits;

pub use kraken::{KrakenFeed, DEFAULT_API_URL};
pub use traits::{MarketData, Timeframe};
