use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use killzone::domain::{Direction, Position, Price};
use killzone::store::PositionStore;
use rust_decimal_macros::dec;
use tempfile::TempDir;

use super::candles::at;

pub const LEDGER_FILE: &str = "open_positions.json";

pub fn temp_store(debounce: Duration) -> (TempDir, Arc<PositionStore>) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = PositionStore::new(dir.path().join(LEDGER_FILE), debounce);
    (dir, Arc::new(store))
}

pub fn ledger_path(dir: &TempDir) -> PathBuf {
    dir.path().join(LEDGER_FILE)
}

pub fn read_ledger(dir: &TempDir) -> Vec<serde_json::Value> {
    let raw = std::fs::read_to_string(ledger_path(dir)).expect("read ledger");
    serde_json::from_str(&raw).expect("parse ledger")
}

pub fn long(symbol: &str, entry: Price, stop_loss: Price, take_profit: Price) -> Position {
    Position::open(symbol, Direction::Long, entry, dec!(1), stop_loss, take_profit, at(14))
        .expect("valid long")
}

pub fn short(symbol: &str, entry: Price, stop_loss: Price, take_profit: Price) -> Position {
    Position::open(symbol, Direction::Short, entry, dec!(1), stop_loss, take_profit, at(14))
        .expect("valid short")
}
