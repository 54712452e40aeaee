//! The module contains the errors the ledger engine can raise.
//!
//! Every mutation runs inside a single database transaction, so any `Err`
//! returned from a handler means the whole operation rolled back. The
//! variants map the failure classes the callers care about:
//!
//! - [`Validation`] rejected before any mutation (bad year/month/amount,
//!   malformed borrower).
//! - [`InsufficientCapital`] a loan request exceeds the year's available
//!   capital; carries the computed value so callers can display it.
//! - [`Duplicate`] the row already exists (deduction for a month, payment
//!   for a period) and no override was requested.
//! - [`NotFound`] the referenced row does not exist or belongs elsewhere.
//! - [`Database`] an underlying storage failure, always a full rollback.
//!
//! [`Validation`]: LedgerError::Validation
//! [`InsufficientCapital`]: LedgerError::InsufficientCapital
//! [`Duplicate`]: LedgerError::Duplicate
//! [`NotFound`]: LedgerError::NotFound
//! [`Database`]: LedgerError::Database
use sea_orm::DbErr;
use thiserror::Error;

use crate::Money;

/// Ledger engine errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Insufficient capital: available {available}, requested {requested}")]
    InsufficientCapital { available: Money, requested: Money },
    #[error("\"{0}\" already recorded!")]
    Duplicate(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (
                Self::InsufficientCapital {
                    available: a,
                    requested: r,
                },
                Self::InsufficientCapital {
                    available: b,
                    requested: s,
                },
            ) => a == b && r == s,
            (Self::Duplicate(a), Self::Duplicate(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
