//! Timer-driven trading cycle.
//!
//! Each tick evaluates entries for every configured symbol while the session
//! is active, then evaluates exits for every open position with a freshly
//! fetched price. Feed failures only ever skip the affected symbol.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::config::Config;
use super::lifecycle::{CloseDecision, OpenDecision, PositionLifecycleManager};
use super::state::EngineState;
use crate::domain::{CandleWindow, Session};
use crate::error::{FeedError, Result};
use crate::exchange::{MarketData, Timeframe};
use crate::service::{CycleSummary, Event, NotifierRegistry};

/// Static parameters of a scheduler run.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub session: Session,
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    pub candle_limit: usize,
    pub tick_interval: Duration,
    pub fetch_timeout: Duration,
}

impl From<&Config> for SchedulerSettings {
    fn from(config: &Config) -> Self {
        Self {
            session: Session::from(&config.session),
            symbols: config.strategy.symbols.clone(),
            timeframe: config.strategy.timeframe,
            candle_limit: config.strategy.candle_limit,
            tick_interval: config.scheduler.tick_interval(),
            fetch_timeout: config.scheduler.fetch_timeout(),
        }
    }
}

/// Runs [`PositionLifecycleManager`] on a fixed interval.
pub struct TradingCycleScheduler {
    state: Arc<EngineState>,
    lifecycle: PositionLifecycleManager,
    feed: Arc<dyn MarketData>,
    notifiers: Arc<NotifierRegistry>,
    settings: SchedulerSettings,
}

impl TradingCycleScheduler {
    #[must_use]
    pub fn new(
        state: Arc<EngineState>,
        lifecycle: PositionLifecycleManager,
        feed: Arc<dyn MarketData>,
        notifiers: Arc<NotifierRegistry>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            state,
            lifecycle,
            feed,
            notifiers,
            settings,
        }
    }

    #[must_use]
    pub fn state(&self) -> &Arc<EngineState> {
        &self.state
    }

    #[must_use]
    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Suspend new entries.
    pub fn pause(&self) {
        if self.state.pause() {
            self.notifiers.notify_all(Event::TradingPaused);
        }
    }

    /// Re-enable new entries.
    pub fn resume(&self) {
        if self.state.resume() {
            self.notifiers.notify_all(Event::TradingResumed);
        }
    }

    async fn bounded<T, F>(&self, symbol: &str, fetch: F) -> std::result::Result<T, FeedError>
    where
        F: Future<Output = std::result::Result<T, FeedError>>,
    {
        match tokio::time::timeout(self.settings.fetch_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout {
                symbol: symbol.to_string(),
            }),
        }
    }

    /// Run one cycle as of `now`.
    pub async fn tick(&self, now: DateTime<Utc>) -> CycleSummary {
        let session = self.settings.session;
        let in_window = session.is_active(now);
        let mut summary = CycleSummary {
            at: Some(now),
            in_window,
            symbols: self.settings.symbols.len(),
            ..CycleSummary::default()
        };

        if in_window && self.state.is_active() {
            for symbol in &self.settings.symbols {
                let candles = self
                    .bounded(
                        symbol,
                        self.feed.fetch_recent_candles(symbol, self.settings.timeframe, self.settings.candle_limit),
                    )
                    .await;
                let candles = match candles {
                    Ok(candles) if !candles.is_empty() => candles,
                    Ok(_) => {
                        warn!(symbol = %symbol, "No candles returned, skipping");
                        summary.skipped += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "Candle fetch failed, skipping");
                        summary.skipped += 1;
                        continue;
                    }
                };

                let window = CandleWindow::new(candles, &session);
                if let OpenDecision::Opened(position) = self.lifecycle.evaluate_open(symbol, &window, now) {
                    summary.opened += 1;
                    self.notifiers.notify_all(Event::PositionOpened(position));
                }
            }
        } else if in_window {
            debug!("Engine paused, skipping entries");
        }

        let store = self.lifecycle.store();
        for position in store.open_positions() {
            let symbol = position.symbol();
            let price = match self.bounded(symbol, self.feed.fetch_current_price(symbol)).await {
                Ok(price) => price,
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Price unavailable, retrying next cycle");
                    summary.skipped += 1;
                    continue;
                }
            };

            let elapsed = session.has_elapsed(position.opened_at(), now);
            if let CloseDecision::Closed(closed) = self.lifecycle.evaluate_close(symbol, price, elapsed, now) {
                summary.closed += 1;
                summary.realized_pnl += closed.realized_pnl().unwrap_or_default();
                self.notifiers.notify_all(Event::PositionClosed(closed));
            }
        }

        summary.open_positions = store.open_positions().len();
        self.notifiers.notify_all(Event::CycleCompleted(summary.clone()));
        summary
    }

    /// Tick until `shutdown` flips to true or its sender is dropped, then
    /// flush the store.
    ///
    /// A tick in progress when shutdown is signalled runs to completion.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            feed = self.feed.name(),
            symbols = self.settings.symbols.len(),
            start_hour = self.settings.session.start_hour,
            end_hour = self.settings.session.end_hour,
            interval_secs = self.settings.tick_interval.as_secs(),
            "Scheduler started"
        );

        let mut interval = tokio::time::interval(self.settings.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                result = shutdown.changed() => {
                    match result {
                        Ok(()) => {
                            if *shutdown.borrow() {
                                info!("Shutdown signal received");
                                break;
                            }
                        }
                        Err(_) => {
                            info!("Shutdown channel closed");
                            break;
                        }
                    }
                }
                _ = interval.tick() => {
                    self.tick(Utc::now()).await;
                }
            }
        }

        if let Err(e) = self.lifecycle.store().flush() {
            error!(error = %e, "Final snapshot failed");
            return Err(e.into());
        }
        info!("Scheduler stopped");
        Ok(())
    }
}
