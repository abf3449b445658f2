//! Crash-safe JSON snapshot file.
//!
//! Writes go to a temp file next to the target, are fsynced, then renamed
//! over the target. A reader therefore sees either the previous or the new
//! fully-written file, never a torn one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{Position, PositionStatus};
use crate::error::PersistenceError;

/// One record of the open-position snapshot.
///
/// Records that fail validation on restore are kept verbatim as
/// [`LedgerEntry::Opaque`] and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LedgerEntry {
    Position(Position),
    Opaque(Value),
}

impl LedgerEntry {
    /// Symbol of the record, if it has a readable one.
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::Position(p) => Some(p.symbol()),
            Self::Opaque(v) => v.get("symbol").and_then(Value::as_str),
        }
    }

    /// Symbol this record keeps from being opened again.
    ///
    /// Opaque records hold their symbol unless they are marked `CLOSED`.
    #[must_use]
    pub fn blocked_symbol(&self) -> Option<&str> {
        match self {
            Self::Position(p) => Some(p.symbol()),
            Self::Opaque(v) => {
                let closed = v
                    .get("status")
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.eq_ignore_ascii_case("CLOSED"));
                if closed {
                    None
                } else {
                    self.symbol()
                }
            }
        }
    }

    #[must_use]
    pub fn as_position(&self) -> Option<&Position> {
        match self {
            Self::Position(p) => Some(p),
            Self::Opaque(_) => None,
        }
    }

    /// Parse a raw record, falling back to opaque when it is not a valid
    /// open position.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<Position>(value.clone()) {
            Ok(position) => match position.validate() {
                Ok(()) if position.status() == PositionStatus::Open => Self::Position(position),
                Ok(()) => {
                    warn!(symbol = %position.symbol(), "Closed record in open snapshot, keeping as opaque");
                    Self::Opaque(value)
                }
                Err(e) => {
                    warn!(error = %e, "Invalid position record, keeping as opaque");
                    Self::Opaque(value)
                }
            },
            Err(e) => {
                warn!(error = %e, "Malformed position record, keeping as opaque");
                Self::Opaque(value)
            }
        }
    }
}

/// A fully written and synced temp file waiting to be renamed into place.
///
/// Dropping it without [`StagedSnapshot::commit`] removes the temp file and
/// leaves the target untouched.
#[derive(Debug)]
pub struct StagedSnapshot {
    temp_path: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedSnapshot {
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Atomically replace the target with the staged content.
    pub fn commit(mut self) -> Result<(), PersistenceError> {
        fs::rename(&self.temp_path, &self.target).map_err(|source| PersistenceError::Write {
            path: self.target.display().to_string(),
            source,
        })?;
        self.committed = true;
        sync_parent(&self.target);
        Ok(())
    }
}

impl Drop for StagedSnapshot {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

/// The on-disk open-position snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "positions.json".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }

    fn write_err(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Write {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// Write `entries` to a synced temp file in the target's directory.
    pub fn stage(&self, entries: &[LedgerEntry]) -> Result<StagedSnapshot, PersistenceError> {
        let json = serde_json::to_vec_pretty(entries).map_err(PersistenceError::Serialize)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.write_err(e))?;
        }

        let staged = StagedSnapshot {
            temp_path: self.temp_path(),
            target: self.path.clone(),
            committed: false,
        };

        let mut file = fs::File::create(&staged.temp_path).map_err(|e| self.write_err(e))?;
        file.write_all(&json).map_err(|e| self.write_err(e))?;
        file.sync_all().map_err(|e| self.write_err(e))?;

        Ok(staged)
    }

    /// Stage and commit in one step.
    pub fn write(&self, entries: &[LedgerEntry]) -> Result<(), PersistenceError> {
        self.stage(entries)?.commit()?;
        debug!(path = %self.path.display(), records = entries.len(), "Snapshot written");
        Ok(())
    }

    /// Load all records. A missing file is an empty ledger.
    pub fn read(&self) -> Result<Vec<LedgerEntry>, PersistenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.display().to_string(),
                    source,
                })
            }
        };

        let values: Vec<Value> =
            serde_json::from_str(&content).map_err(|source| PersistenceError::Corrupt {
                path: self.path.display().to_string(),
                source,
            })?;

        Ok(values.into_iter().map(LedgerEntry::from_value).collect())
    }

    /// Move an unreadable snapshot out of the way so the next write does not
    /// destroy it. Returns where it went.
    pub fn quarantine(&self) -> Result<PathBuf, PersistenceError> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dest = self.path.with_file_name(format!("{name}.corrupt-{stamp}"));
        fs::rename(&self.path, &dest).map_err(|e| self.write_err(e))?;
        Ok(dest)
    }
}

#[cfg(unix)]
fn sync_parent(path: &Path) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn position(symbol: &str) -> Position {
        Position::open(
            symbol,
            Direction::Long,
            dec!(100),
            dec!(0.001),
            dec!(90),
            dec!(120),
            Utc.with_ymd_and_hms(2025, 12, 16, 12, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("open_positions.json"));
        assert!(file.read().unwrap().is_empty());
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("open_positions.json"));
        file.write(&[LedgerEntry::Position(position("BTC/USD"))]).unwrap();

        let entries = file.read().unwrap();
        assert_eq!(entries, vec![LedgerEntry::Position(position("BTC/USD"))]);
        assert!(!file.temp_path().exists());
    }

    #[test]
    fn creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("nested/state/open_positions.json"));
        file.write(&[]).unwrap();
        assert!(file.path().exists());
    }

    #[test]
    fn dropped_stage_leaves_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("open_positions.json"));
        file.write(&[LedgerEntry::Position(position("BTC/USD"))]).unwrap();

        let staged = file
            .stage(&[
                LedgerEntry::Position(position("BTC/USD")),
                LedgerEntry::Position(position("ETH/USD")),
            ])
            .unwrap();
        let temp = staged.temp_path().to_path_buf();
        assert!(temp.exists());
        drop(staged);

        assert!(!temp.exists());
        assert_eq!(file.read().unwrap().len(), 1);
    }

    #[test]
    fn malformed_records_are_kept_opaque() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("open_positions.json");
        let good = serde_json::to_value(position("BTC/USD")).unwrap();
        let content = serde_json::json!([
            good,
            {"symbol": "ETH/USD", "direction": "SIDEWAYS"},
            42
        ]);
        fs::write(&path, content.to_string()).unwrap();

        let entries = SnapshotFile::new(&path).read().unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].as_position().is_some());
        assert_eq!(entries[1].symbol(), Some("ETH/USD"));
        assert!(matches!(entries[2], LedgerEntry::Opaque(_)));
    }

    #[test]
    fn opaque_records_round_trip_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("open_positions.json"));
        let raw = serde_json::json!({"symbol": "DOT/USD", "amount_base": "?"});
        file.write(&[LedgerEntry::Opaque(raw.clone())]).unwrap();

        assert_eq!(file.read().unwrap(), vec![LedgerEntry::Opaque(raw)]);
    }

    #[test]
    fn corrupt_file_is_an_error_and_can_be_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("open_positions.json");
        fs::write(&path, "{ not json").unwrap();

        let file = SnapshotFile::new(&path);
        assert!(matches!(file.read(), Err(PersistenceError::Corrupt { .. })));

        let moved = file.quarantine().unwrap();
        assert!(moved.exists());
        assert!(!path.exists());
    }
}
