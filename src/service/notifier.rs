//! Event notifications.
//!
//! The engine reports what it did through [`Notifier`] implementations.
//! Notifiers are observers only; nothing they do feeds back into trading.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::domain::Position;

/// Events emitted by the engine.
#[derive(Debug, Clone)]
pub enum Event {
    /// A position was opened and recorded.
    PositionOpened(Position),
    /// A position was closed; carries the closed record.
    PositionClosed(Position),
    /// A scheduler cycle finished.
    CycleCompleted(CycleSummary),
    /// New entries were suspended.
    TradingPaused,
    /// New entries were re-enabled.
    TradingResumed,
}

/// What one scheduler cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Cycle start time.
    pub at: Option<DateTime<Utc>>,
    /// Whether the session window was active for this cycle.
    pub in_window: bool,
    /// Symbols evaluated.
    pub symbols: usize,
    /// Symbols whose data could not be fetched this cycle.
    pub skipped: usize,
    /// Positions opened.
    pub opened: usize,
    /// Positions closed.
    pub closed: usize,
    /// Positions open after the cycle.
    pub open_positions: usize,
    /// Realized PnL of positions closed in this cycle.
    pub realized_pnl: Decimal,
}

/// Receiver of engine events.
///
/// `notify` is called inline from the trading cycle, so it must return
/// quickly. Slow sinks should hand the event to a task of their own.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: Event);
}

/// Broadcasts each event to every registered notifier.
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Drops every event.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

/// Logs every event through `tracing`.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        match event {
            Event::PositionOpened(p) => {
                info!(
                    symbol = %p.symbol(),
                    direction = %p.direction(),
                    entry = %p.entry_price(),
                    size = %p.size(),
                    stop_loss = %p.stop_loss(),
                    take_profit = %p.take_profit(),
                    "Position opened"
                );
            }
            Event::PositionClosed(p) => {
                info!(
                    symbol = %p.symbol(),
                    direction = %p.direction(),
                    exit = ?p.exit_price(),
                    reason = ?p.exit_reason(),
                    pnl = ?p.realized_pnl(),
                    "Position closed"
                );
            }
            Event::CycleCompleted(s) => {
                info!(
                    in_window = s.in_window,
                    symbols = s.symbols,
                    skipped = s.skipped,
                    opened = s.opened,
                    closed = s.closed,
                    open_positions = s.open_positions,
                    pnl = %s.realized_pnl,
                    "Cycle completed"
                );
            }
            Event::TradingPaused => info!("Trading paused"),
            Event::TradingResumed => info!("Trading resumed"),
        }
    }
}
