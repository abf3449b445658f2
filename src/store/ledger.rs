//! The open-position ledger and its debounced persistence.
//!
//! Every mutation, query and snapshot write goes through a single mutex, so
//! no caller (scheduler tick, deferred writer, status query) ever sees a
//! position both open and closed.
//!
//! Writes fsync while holding the lock. Immediate writes run on the calling
//! thread; deferred writes run on tokio's blocking pool.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::snapshot::{LedgerEntry, SnapshotFile};
use crate::domain::{ExitReason, Position, Price};
use crate::error::PersistenceError;

/// Default coalescing window for snapshot requests.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// What a snapshot request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// Written to disk before returning.
    Written,
    /// A deferred write was scheduled.
    Deferred,
    /// Folded into an already scheduled write.
    Coalesced,
    /// The write failed; it will be retried on the next request.
    Failed,
}

#[derive(Debug, Default)]
struct Ledger {
    open: Vec<LedgerEntry>,
    closed: Vec<Position>,
    last_write: Option<Instant>,
    /// A deferred write is scheduled.
    pending: bool,
    /// Mutations not yet on disk.
    dirty: bool,
}

impl Ledger {
    fn has_symbol(&self, symbol: &str) -> bool {
        self.open.iter().any(|e| e.blocked_symbol() == Some(symbol))
    }
}

/// Shared ledger of open positions plus append-only closed history.
#[derive(Debug)]
pub struct PositionStore {
    state: Mutex<Ledger>,
    file: SnapshotFile,
    debounce: Duration,
    writes: AtomicU64,
}

impl PositionStore {
    /// An empty store persisting to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, debounce: Duration) -> Self {
        Self {
            state: Mutex::new(Ledger::default()),
            file: SnapshotFile::new(path),
            debounce,
            writes: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn file(&self) -> &SnapshotFile {
        &self.file
    }

    /// Replace the open set with the on-disk snapshot and return the typed
    /// positions in it.
    ///
    /// A missing file yields an empty ledger. Unparseable records stay in
    /// the open set as opaque entries. A file that is not a JSON array at
    /// all is moved aside and the ledger starts empty.
    pub fn restore(&self) -> Result<Vec<Position>, PersistenceError> {
        let entries = match self.file.read() {
            Ok(entries) => entries,
            Err(e @ PersistenceError::Corrupt { .. }) => {
                warn!(error = %e, "Snapshot unreadable, starting with an empty ledger");
                match self.file.quarantine() {
                    Ok(dest) => warn!(moved_to = %dest.display(), "Corrupt snapshot preserved"),
                    Err(qe) => error!(error = %qe, "Failed to move corrupt snapshot aside"),
                }
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let opaque = entries.iter().filter(|e| e.as_position().is_none()).count();
        let positions: Vec<Position> = entries.iter().filter_map(LedgerEntry::as_position).cloned().collect();
        for symbol in entries
            .iter()
            .filter(|e| e.as_position().is_none())
            .filter_map(LedgerEntry::blocked_symbol)
        {
            warn!(symbol, "Unreadable open record blocks new entries for symbol");
        }

        let mut ledger = self.state.lock();
        ledger.open = entries;
        ledger.dirty = false;

        info!(
            path = %self.file.path().display(),
            positions = positions.len(),
            opaque,
            "Open positions restored"
        );
        Ok(positions)
    }

    /// Insert `position` unless its symbol already has an open record.
    pub fn try_open(&self, position: Position) -> bool {
        let mut ledger = self.state.lock();
        if ledger.has_symbol(position.symbol()) {
            debug!(symbol = %position.symbol(), "Position already open");
            return false;
        }
        ledger.open.push(LedgerEntry::Position(position));
        ledger.dirty = true;
        true
    }

    /// Whether `symbol` has an open record (typed, or opaque and not closed).
    #[must_use]
    pub fn is_open(&self, symbol: &str) -> bool {
        self.state.lock().has_symbol(symbol)
    }

    /// Copy of the open position for `symbol`.
    #[must_use]
    pub fn get_open(&self, symbol: &str) -> Option<Position> {
        self.state
            .lock()
            .open
            .iter()
            .filter_map(LedgerEntry::as_position)
            .find(|p| p.symbol() == symbol)
            .cloned()
    }

    /// Copies of all typed open positions.
    #[must_use]
    pub fn open_positions(&self) -> Vec<Position> {
        self.state
            .lock()
            .open
            .iter()
            .filter_map(LedgerEntry::as_position)
            .cloned()
            .collect()
    }

    /// Number of open records kept opaque after restore.
    #[must_use]
    pub fn opaque_count(&self) -> usize {
        self.state
            .lock()
            .open
            .iter()
            .filter(|e| e.as_position().is_none())
            .count()
    }

    /// Symbols held by opaque records, in ledger order.
    #[must_use]
    pub fn blocked_symbols(&self) -> Vec<String> {
        self.state
            .lock()
            .open
            .iter()
            .filter(|e| e.as_position().is_none())
            .filter_map(LedgerEntry::blocked_symbol)
            .map(str::to_string)
            .collect()
    }

    /// Copies of closed trades, oldest first.
    #[must_use]
    pub fn closed_trades(&self) -> Vec<Position> {
        self.state.lock().closed.clone()
    }

    /// Sum of realized PnL over closed trades.
    #[must_use]
    pub fn realized_pnl(&self) -> Price {
        self.state
            .lock()
            .closed
            .iter()
            .filter_map(Position::realized_pnl)
            .sum()
    }

    /// Close the open position for `symbol` and move it to history.
    ///
    /// Returns the closed record, or `None` when no typed position is open
    /// for the symbol.
    pub fn close(
        &self,
        symbol: &str,
        exit_price: Price,
        reason: ExitReason,
        closed_at: DateTime<Utc>,
    ) -> Option<Position> {
        let mut ledger = self.state.lock();
        let idx = ledger
            .open
            .iter()
            .position(|e| e.as_position().is_some_and(|p| p.symbol() == symbol))?;

        let LedgerEntry::Position(mut position) = ledger.open.remove(idx) else {
            return None;
        };
        if let Err(e) = position.close(exit_price, reason, closed_at) {
            warn!(error = %e, "Refusing to close position");
            ledger.open.insert(idx, LedgerEntry::Position(position));
            return None;
        }
        ledger.closed.push(position.clone());
        ledger.dirty = true;
        Some(position)
    }

    /// Number of snapshot files committed by this store.
    #[must_use]
    pub fn persisted_writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Whether there are mutations not yet on disk.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    /// Write the current open set immediately.
    pub fn snapshot_now(&self) -> Result<(), PersistenceError> {
        let mut ledger = self.state.lock();
        self.write_locked(&mut ledger)
    }

    /// Debounced snapshot.
    ///
    /// Writes immediately when the last write is older than the debounce
    /// window. Otherwise schedules one deferred write at the end of the
    /// window; further requests before it fires are folded into it. The
    /// deferred write re-reads the ledger under the lock when it fires, so
    /// it always carries the latest state.
    pub fn request_snapshot(self: &Arc<Self>) -> SnapshotOutcome {
        let mut ledger = self.state.lock();
        ledger.dirty = true;

        if ledger.pending {
            return SnapshotOutcome::Coalesced;
        }

        let now = Instant::now();
        let wait = ledger
            .last_write
            .map(|last| now.saturating_duration_since(last))
            .filter(|elapsed| *elapsed < self.debounce)
            .map(|elapsed| self.debounce - elapsed);

        if let Some(delay) = wait {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                ledger.pending = true;
                let store = Arc::clone(self);
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Err(e) = tokio::task::spawn_blocking(move || store.fire_deferred()).await {
                        error!(error = %e, "Deferred snapshot task failed");
                    }
                });
                debug!(delay_ms = delay.as_millis() as u64, "Snapshot deferred");
                return SnapshotOutcome::Deferred;
            }
        }

        match self.write_locked(&mut ledger) {
            Ok(()) => SnapshotOutcome::Written,
            Err(_) => SnapshotOutcome::Failed,
        }
    }

    /// Write anything not yet on disk, cancelling a scheduled write.
    pub fn flush(&self) -> Result<(), PersistenceError> {
        let mut ledger = self.state.lock();
        if !ledger.dirty && !ledger.pending {
            return Ok(());
        }
        ledger.pending = false;
        self.write_locked(&mut ledger)
    }

    fn fire_deferred(&self) {
        let mut ledger = self.state.lock();
        if !ledger.pending {
            // flushed in the meantime
            return;
        }
        ledger.pending = false;
        if self.write_locked(&mut ledger).is_err() {
            warn!("Deferred snapshot failed, retrying on next request");
        }
    }

    fn write_locked(&self, ledger: &mut Ledger) -> Result<(), PersistenceError> {
        match self.file.write(&ledger.open) {
            Ok(()) => {
                ledger.last_write = Some(Instant::now());
                ledger.dirty = false;
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to persist open positions");
                ledger.dirty = true;
                Err(e)
            }
        }
    }
}
