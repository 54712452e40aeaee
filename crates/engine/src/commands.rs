//! Command structs for engine operations.
//!
//! These types group parameters for write operations (loan creation, advance
//! payments, deductions), keeping call sites readable and avoiding long
//! argument lists.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{Borrower, Money, capital_deductions::DEFAULT_MONTHLY_FEE};

/// Create a loan attributed to a ledger year.
#[derive(Clone, Debug)]
pub struct CreateLoanCmd {
    pub borrower: Borrower,
    pub amount: Money,
    pub year: i32,
    /// Basis points; defaults by borrower type when `None`.
    pub interest_rate_bps: Option<i64>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

impl CreateLoanCmd {
    #[must_use]
    pub fn new(borrower: Borrower, amount: Money, year: i32) -> Self {
        Self {
            borrower,
            amount,
            year,
            interest_rate_bps: None,
            description: None,
            notes: None,
        }
    }

    #[must_use]
    pub fn interest_rate_bps(mut self, rate_bps: i64) -> Self {
        self.interest_rate_bps = Some(rate_bps);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Record an advance principal payment against a loan.
#[derive(Clone, Debug)]
pub struct RecordAdvancePaymentCmd {
    pub loan_id: Uuid,
    pub amount: Money,
    /// Also the effective date for repricing the pending interest schedule:
    /// rows from this date's month through December are recomputed.
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
}

impl RecordAdvancePaymentCmd {
    #[must_use]
    pub fn new(loan_id: Uuid, amount: Money, payment_date: NaiveDate) -> Self {
        Self {
            loan_id,
            amount,
            payment_date,
            notes: None,
        }
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Record a manual capital deduction for a (year, month).
#[derive(Clone, Debug)]
pub struct AddDeductionCmd {
    pub year: i32,
    pub month: u32,
    pub amount: Money,
    pub description: Option<String>,
    pub recorded_by: Option<Uuid>,
    /// Allow a second deduction for the same (year, month).
    pub force: bool,
}

impl AddDeductionCmd {
    #[must_use]
    pub fn new(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            amount: DEFAULT_MONTHLY_FEE,
            description: None,
            recorded_by: None,
            force: false,
        }
    }

    #[must_use]
    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn recorded_by(mut self, user_id: Uuid) -> Self {
        self.recorded_by = Some(user_id);
        self
    }

    #[must_use]
    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }
}
