//! Killzone - session-bias paper trading engine.
//!
//! Scores the directional tendency of a daily UTC "kill zone" session from
//! recent candles, opens at most one paper position per symbol when the
//! bias clears a volatility-scaled threshold, and manages each position to
//! a take-profit, stop-loss or end-of-session exit.
//!
//! # Modules
//!
//! - [`domain`] - Candles, the bias signal, ATR risk sizing, positions, reports
//! - [`store`] - Deduplicating position ledger with atomic, debounced snapshots
//! - [`exchange`] - Market data port and the Kraken REST adapter
//! - [`service`] - Event notifications
//! - [`app`] - Configuration, engine state, lifecycle manager and scheduler
//! - [`cli`] - Command-line handlers
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use killzone::app::{LifecycleParams, OpenDecision, PositionLifecycleManager};
//! use killzone::domain::{CandleWindow, RiskSizer, Session};
//! use killzone::store::{PositionStore, DEFAULT_DEBOUNCE};
//!
//! let store = Arc::new(PositionStore::new("open_positions.json", DEFAULT_DEBOUNCE));
//! store.restore().unwrap();
//!
//! let manager = PositionLifecycleManager::new(store, RiskSizer::default(), LifecycleParams::default());
//! let window = CandleWindow::new(vec![], &Session::default());
//! let decision = manager.evaluate_open("BTC/USD", &window, chrono::Utc::now());
//! assert_eq!(decision, OpenDecision::InsufficientHistory);
//! ```

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod service;
pub mod store;
