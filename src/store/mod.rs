//! Position persistence: the guarded in-memory ledger and its atomic,
//! debounced JSON snapshot.

mod ledger;
mod snapshot;

pub use ledger::{PositionStore, SnapshotOutcome, DEFAULT_DEBOUNCE};
pub use snapshot::{LedgerEntry, SnapshotFile, StagedSnapshot};
