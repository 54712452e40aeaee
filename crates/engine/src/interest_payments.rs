//! Monthly interest schedule rows.
//!
//! One row per (loan, month, year). `amount` is recomputed from the loan's
//! remaining balance whenever an advance payment lands, but only for rows
//! still `pending`; rows already marked paid are historical facts and never
//! change. January is always zero: interest starts the month after a loan is
//! made.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, Money};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            other => Err(LedgerError::Validation(format!(
                "invalid payment status: {other}"
            ))),
        }
    }
}

/// The scheduled interest for a month: zero in January, otherwise one month
/// of interest on the remaining balance.
#[must_use]
pub fn amount_due(month: u32, remaining_balance: Money, rate_bps: i64) -> Money {
    if month == 1 {
        Money::ZERO
    } else {
        remaining_balance.monthly_interest(rate_bps)
    }
}

/// Outcome of landing a moved schedule row on one that already exists at the
/// target (loan, month, year).
///
/// The moved row is always dropped; the question is which side's data the
/// surviving target row carries, and whether a paid amount was discarded and
/// must be accounted by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MergeOutcome {
    /// Target survives unchanged.
    KeepTarget,
    /// Target survives unchanged; the moved row was paid, so its amount is
    /// dropped from the books and must be reported.
    KeepTargetDiscardPaid,
    /// Target adopts the moved row's status, amount, and payment metadata.
    AdoptMoved,
}

/// Decision table for duplicate schedule rows during a year reassignment:
/// prefer `paid` status, then prefer the more complete side.
pub(crate) fn resolve_duplicate(moved: PaymentStatus, target: PaymentStatus) -> MergeOutcome {
    match (moved, target) {
        (PaymentStatus::Paid, PaymentStatus::Paid) => MergeOutcome::KeepTargetDiscardPaid,
        (PaymentStatus::Paid, PaymentStatus::Pending) => MergeOutcome::AdoptMoved,
        (PaymentStatus::Pending, PaymentStatus::Paid) => MergeOutcome::KeepTarget,
        (PaymentStatus::Pending, PaymentStatus::Pending) => MergeOutcome::KeepTarget,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestPayment {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub month: u32,
    pub year: i32,
    pub amount: Money,
    pub status: PaymentStatus,
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl InterestPayment {
    pub(crate) fn new(loan_id: Uuid, month: u32, year: i32, amount: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            month,
            year,
            amount,
            status: PaymentStatus::Pending,
            payment_date: None,
            notes: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "interest_payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub loan_id: String,
    pub month: i32,
    pub year: i32,
    pub amount_minor: i64,
    pub status: String,
    pub payment_date: Option<Date>,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::loans::Entity",
        from = "Column::LoanId",
        to = "super::loans::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Loans,
}

impl Related<super::loans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&InterestPayment> for ActiveModel {
    fn from(payment: &InterestPayment) -> Self {
        Self {
            id: ActiveValue::Set(payment.id.to_string()),
            loan_id: ActiveValue::Set(payment.loan_id.to_string()),
            month: ActiveValue::Set(payment.month as i32),
            year: ActiveValue::Set(payment.year),
            amount_minor: ActiveValue::Set(payment.amount.minor()),
            status: ActiveValue::Set(payment.status.as_str().to_string()),
            payment_date: ActiveValue::Set(payment.payment_date),
            notes: ActiveValue::Set(payment.notes.clone()),
        }
    }
}

impl TryFrom<Model> for InterestPayment {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::NotFound("interest payment not exists".to_string()))?,
            loan_id: Uuid::parse_str(&model.loan_id)
                .map_err(|_| LedgerError::NotFound("loan not exists".to_string()))?,
            month: model.month as u32,
            year: model.year,
            amount: Money::new(model.amount_minor),
            status: PaymentStatus::try_from(model.status.as_str())?,
            payment_date: model.payment_date,
            notes: model.notes,
        })
    }
}
