//! Advance payment rows: out-of-schedule principal repayments.
//!
//! Recording one lowers the owning loan's balance (floor 0); reverting one
//! restores it (ceiling the original amount). Both trigger a repricing of the
//! loan's still-pending interest schedule rows.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, Money};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancePayment {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
}

impl AdvancePayment {
    pub(crate) fn new(
        loan_id: Uuid,
        amount: Money,
        payment_date: NaiveDate,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            amount,
            payment_date,
            notes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "advance_payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub loan_id: String,
    pub amount_minor: i64,
    pub payment_date: Date,
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

impl From<&AdvancePayment> for ActiveModel {
    fn from(payment: &AdvancePayment) -> Self {
        Self {
            id: ActiveValue::Set(payment.id.to_string()),
            loan_id: ActiveValue::Set(payment.loan_id.to_string()),
            amount_minor: ActiveValue::Set(payment.amount.minor()),
            payment_date: ActiveValue::Set(payment.payment_date),
            notes: ActiveValue::Set(payment.notes.clone()),
        }
    }
}

impl TryFrom<Model> for AdvancePayment {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::NotFound("advance payment not exists".to_string()))?,
            loan_id: Uuid::parse_str(&model.loan_id)
                .map_err(|_| LedgerError::NotFound("loan not exists".to_string()))?,
            amount: Money::new(model.amount_minor),
            payment_date: model.payment_date,
            notes: model.notes,
        })
    }
}
