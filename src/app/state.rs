//! Shared engine state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::domain::{Position, Price};
use crate::store::PositionStore;

/// Point-in-time view for status queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub active: bool,
    pub open_positions: Vec<Position>,
    pub closed_trades: usize,
    pub realized_pnl: Price,
}

/// State shared by the scheduler and any command surface.
///
/// Holds the position store and the "active" flag. While inactive, no new
/// positions are opened; open positions are still managed to exit.
pub struct EngineState {
    store: Arc<PositionStore>,
    active: AtomicBool,
}

impl EngineState {
    #[must_use]
    pub fn new(store: Arc<PositionStore>) -> Self {
        Self {
            store,
            active: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<PositionStore> {
        &self.store
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stop opening positions. Returns whether the flag changed.
    pub fn pause(&self) -> bool {
        self.active.swap(false, Ordering::SeqCst)
    }

    /// Resume opening positions. Returns whether the flag changed.
    pub fn resume(&self) -> bool {
        !self.active.swap(true, Ordering::SeqCst)
    }

    #[must_use]
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            active: self.is_active(),
            open_positions: self.store.open_positions(),
            closed_trades: self.store.closed_trades().len(),
            realized_pnl: self.store.realized_pnl(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DEFAULT_DEBOUNCE;

    fn state() -> (tempfile::TempDir, EngineState) {
        let dir = tempfile::tempdir().unwrap();
        let store = PositionStore::new(dir.path().join("open_positions.json"), DEFAULT_DEBOUNCE);
        (dir, EngineState::new(Arc::new(store)))
    }

    #[test]
    fn starts_active() {
        let (_dir, state) = state();
        assert!(state.is_active());
        let status = state.status();
        assert!(status.active);
        assert!(status.open_positions.is_empty());
        assert_eq!(status.closed_trades, 0);
    }

    #[test]
    fn pause_and_resume_report_transitions() {
        let (_dir, state) = state();
        assert!(state.pause());
        assert!(!state.pause());
        assert!(!state.is_active());
        assert!(state.resume());
        assert!(!state.resume());
        assert!(state.is_active());
    }
}
