//! Domain validation errors.
//!
//! Returned when a position would violate one of the ledger invariants:
//! positive size, positive finite levels on the correct side of entry, and
//! a single OPEN to CLOSED transition.

use thiserror::Error;

use super::Price;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Size must be positive.
    #[error("size must be positive, got {size}")]
    NonPositiveSize {
        /// The invalid size that was provided.
        size: rust_decimal::Decimal,
    },

    /// Entry, stop and target must all be positive.
    #[error("{field} must be positive, got {value}")]
    NonPositivePrice {
        /// Which level was invalid.
        field: &'static str,
        /// The invalid value.
        value: Price,
    },

    /// Stop and target must straddle the entry in the trade's direction.
    #[error("levels do not bracket entry {entry}: stop {stop_loss}, target {take_profit}")]
    LevelsMisordered {
        entry: Price,
        stop_loss: Price,
        take_profit: Price,
    },

    /// Closing a position that is already closed.
    #[error("position for {symbol} is already closed")]
    AlreadyClosed {
        /// Symbol of the closed position.
        symbol: String,
    },

    /// A closed record is missing its exit fields.
    #[error("closed position for {symbol} has no exit data")]
    MissingExit {
        /// Symbol of the incomplete record.
        symbol: String,
    },
}
