//! Capital audit log rows.
//!
//! Append-only: every capital-affecting event (loan disbursement, interest
//! payment, contribution payment) writes one row, and reverting the event
//! deletes exactly that row again. Reversal is an exact lookup on the
//! `(source_kind, source_id)` tag written at creation time, never a match on
//! the description text.
//!
//! The cached yearly totals are still derived by recomputation from the
//! underlying payment rows, so a missed or duplicated audit row cannot drift
//! the books; the log exists for the activity feed and for auditing.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Money};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapitalEntryKind {
    Addition,
    Deduction,
    Manual,
}

impl CapitalEntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Addition => "addition",
            Self::Deduction => "deduction",
            Self::Manual => "manual",
        }
    }
}

impl TryFrom<&str> for CapitalEntryKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "addition" => Ok(Self::Addition),
            "deduction" => Ok(Self::Deduction),
            "manual" => Ok(Self::Manual),
            other => Err(LedgerError::Validation(format!(
                "invalid capital entry kind: {other}"
            ))),
        }
    }
}

/// What kind of ledger row produced an audit entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapitalSourceKind {
    LoanDisbursement,
    InterestPayment,
    Contribution,
}

impl CapitalSourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LoanDisbursement => "loan_disbursement",
            Self::InterestPayment => "interest_payment",
            Self::Contribution => "contribution",
        }
    }
}

impl TryFrom<&str> for CapitalSourceKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "loan_disbursement" => Ok(Self::LoanDisbursement),
            "interest_payment" => Ok(Self::InterestPayment),
            "contribution" => Ok(Self::Contribution),
            other => Err(LedgerError::Validation(format!(
                "invalid capital source kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapitalTransaction {
    pub id: i64,
    pub year: i32,
    pub loan_id: Option<String>,
    pub kind: CapitalEntryKind,
    pub amount: Money,
    pub description: String,
    pub source_kind: Option<CapitalSourceKind>,
    pub source_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "capital_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub year: i32,
    pub loan_id: Option<String>,
    pub kind: String,
    pub amount_minor: i64,
    pub description: String,
    pub source_kind: Option<String>,
    pub source_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::loans::Entity",
        from = "Column::LoanId",
        to = "super::loans::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Loans,
}

impl Related<super::loans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for CapitalTransaction {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            year: model.year,
            loan_id: model.loan_id,
            kind: CapitalEntryKind::try_from(model.kind.as_str())?,
            amount: Money::new(model.amount_minor),
            description: model.description,
            source_kind: model
                .source_kind
                .as_deref()
                .map(CapitalSourceKind::try_from)
                .transpose()?,
            source_id: model.source_id,
        })
    }
}

pub(crate) fn entry(
    year: i32,
    loan_id: Option<String>,
    kind: CapitalEntryKind,
    amount: Money,
    description: String,
    source: Option<(CapitalSourceKind, String)>,
) -> ActiveModel {
    let (source_kind, source_id) = match source {
        Some((kind, id)) => (Some(kind.as_str().to_string()), Some(id)),
        None => (None, None),
    };
    ActiveModel {
        id: ActiveValue::NotSet,
        year: ActiveValue::Set(year),
        loan_id: ActiveValue::Set(loan_id),
        kind: ActiveValue::Set(kind.as_str().to_string()),
        amount_minor: ActiveValue::Set(amount.minor()),
        description: ActiveValue::Set(description),
        source_kind: ActiveValue::Set(source_kind),
        source_id: ActiveValue::Set(source_id),
    }
}
