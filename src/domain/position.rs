//! Paper positions and their single OPEN to CLOSED transition.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::{Price, Volume};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// Lifecycle status of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    /// Session elapsed without either level being hit.
    TimeExit,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TakeProfit => write!(f, "TAKE_PROFIT"),
            Self::StopLoss => write!(f, "STOP_LOSS"),
            Self::TimeExit => write!(f, "TIME_EXIT"),
        }
    }
}

/// A simulated position in one symbol.
///
/// Exit fields are `None` while the position is open and all set once it
/// closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    symbol: String,
    direction: Direction,
    entry_price: Price,
    size: Volume,
    stop_loss: Price,
    take_profit: Price,
    status: PositionStatus,
    opened_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exit_price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exit_reason: Option<ExitReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    realized_pnl: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    closed_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Create an open position, validating size and levels.
    pub fn open(
        symbol: impl Into<String>,
        direction: Direction,
        entry_price: Price,
        size: Volume,
        stop_loss: Price,
        take_profit: Price,
        opened_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let position = Self {
            symbol: symbol.into(),
            direction,
            entry_price,
            size,
            stop_loss,
            take_profit,
            status: PositionStatus::Open,
            opened_at,
            exit_price: None,
            exit_reason: None,
            realized_pnl: None,
            closed_at: None,
        };
        position.validate()?;
        Ok(position)
    }

    /// Check the structural invariants of this record.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.size <= Decimal::ZERO {
            return Err(DomainError::NonPositiveSize { size: self.size });
        }
        for (field, value) in [
            ("entry_price", self.entry_price),
            ("stop_loss", self.stop_loss),
            ("take_profit", self.take_profit),
        ] {
            if value <= Decimal::ZERO {
                return Err(DomainError::NonPositivePrice { field, value });
            }
        }

        let bracketed = match self.direction {
            Direction::Long => self.stop_loss < self.entry_price && self.entry_price < self.take_profit,
            Direction::Short => self.take_profit < self.entry_price && self.entry_price < self.stop_loss,
        };
        if !bracketed {
            return Err(DomainError::LevelsMisordered {
                entry: self.entry_price,
                stop_loss: self.stop_loss,
                take_profit: self.take_profit,
            });
        }

        if self.status == PositionStatus::Closed
            && (self.exit_price.is_none() || self.exit_reason.is_none() || self.realized_pnl.is_none())
        {
            return Err(DomainError::MissingExit {
                symbol: self.symbol.clone(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn entry_price(&self) -> Price {
        self.entry_price
    }

    /// Size in base-currency units.
    #[must_use]
    pub fn size(&self) -> Volume {
        self.size
    }

    #[must_use]
    pub fn stop_loss(&self) -> Price {
        self.stop_loss
    }

    #[must_use]
    pub fn take_profit(&self) -> Price {
        self.take_profit
    }

    #[must_use]
    pub fn status(&self) -> PositionStatus {
        self.status
    }

    #[must_use]
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    #[must_use]
    pub fn exit_price(&self) -> Option<Price> {
        self.exit_price
    }

    #[must_use]
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }

    #[must_use]
    pub fn realized_pnl(&self) -> Option<Price> {
        self.realized_pnl
    }

    #[must_use]
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// PnL of exiting at `exit_price`: `(exit - entry) * size`, negated for
    /// shorts.
    #[must_use]
    pub fn pnl_at(&self, exit_price: Price) -> Price {
        let pnl = (exit_price - self.entry_price) * self.size;
        match self.direction {
            Direction::Long => pnl,
            Direction::Short => -pnl,
        }
    }

    /// Transition OPEN to CLOSED. Fails if already closed.
    pub fn close(
        &mut self,
        exit_price: Price,
        reason: ExitReason,
        closed_at: DateTime<Utc>,
    ) -> Result<Price, DomainError> {
        if !self.is_open() {
            return Err(DomainError::AlreadyClosed {
                symbol: self.symbol.clone(),
            });
        }
        let pnl = self.pnl_at(exit_price);
        self.status = PositionStatus::Closed;
        self.exit_price = Some(exit_price);
        self.exit_reason = Some(reason);
        self.realized_pnl = Some(pnl);
        self.closed_at = Some(closed_at);
        Ok(pnl)
    }
}
