use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use killzone::domain::{Candle, Price};
use killzone::error::FeedError;
use killzone::exchange::{MarketData, Timeframe};

/// Deterministic market data double.
///
/// Symbols with nothing scripted answer `DataUnavailable`; symbols marked
/// as hanging never answer at all.
#[derive(Debug, Default)]
pub struct ScriptedFeed {
    candles: Mutex<HashMap<String, Result<Vec<Candle>, FeedError>>>,
    prices: Mutex<HashMap<String, Result<Price, FeedError>>>,
    hanging: Mutex<HashSet<String>>,
    candle_calls: Mutex<Vec<String>>,
    price_calls: Mutex<Vec<String>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_candles(&self, symbol: &str, candles: Vec<Candle>) {
        self.candles
            .lock()
            .expect("lock candles")
            .insert(symbol.to_string(), Ok(candles));
    }

    pub fn fail_candles(&self, symbol: &str, reason: &str) {
        self.candles
            .lock()
            .expect("lock candles")
            .insert(symbol.to_string(), Err(FeedError::unavailable(symbol, reason)));
    }

    pub fn set_price(&self, symbol: &str, price: Price) {
        self.prices
            .lock()
            .expect("lock prices")
            .insert(symbol.to_string(), Ok(price));
    }

    pub fn clear_price(&self, symbol: &str) {
        self.prices.lock().expect("lock prices").remove(symbol);
    }

    pub fn hang(&self, symbol: &str) {
        self.hanging
            .lock()
            .expect("lock hanging")
            .insert(symbol.to_string());
    }

    pub fn candle_calls(&self) -> Vec<String> {
        self.candle_calls.lock().expect("lock calls").clone()
    }

    pub fn price_calls(&self) -> Vec<String> {
        self.price_calls.lock().expect("lock calls").clone()
    }

    fn is_hanging(&self, symbol: &str) -> bool {
        self.hanging.lock().expect("lock hanging").contains(symbol)
    }
}

#[async_trait]
impl MarketData for ScriptedFeed {
    async fn fetch_recent_candles(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, FeedError> {
        self.candle_calls
            .lock()
            .expect("lock calls")
            .push(symbol.to_string());
        if self.is_hanging(symbol) {
            std::future::pending::<()>().await;
        }
        let scripted = self.candles.lock().expect("lock candles").get(symbol).cloned();
        match scripted {
            Some(Ok(mut candles)) => {
                let excess = candles.len().saturating_sub(limit);
                candles.drain(..excess);
                Ok(candles)
            }
            Some(Err(e)) => Err(e),
            None => Err(FeedError::unavailable(symbol, "not scripted")),
        }
    }

    async fn fetch_current_price(&self, symbol: &str) -> Result<Price, FeedError> {
        self.price_calls
            .lock()
            .expect("lock calls")
            .push(symbol.to_string());
        if self.is_hanging(symbol) {
            std::future::pending::<()>().await;
        }
        self.prices
            .lock()
            .expect("lock prices")
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| Err(FeedError::unavailable(symbol, "not scripted")))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
