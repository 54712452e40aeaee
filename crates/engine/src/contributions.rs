//! Monthly contribution rows.
//!
//! One row per (member, month, year) with a fixed fee. The row's stored
//! `year` is authoritative for capital accounting: a contribution can be
//! marked paid while an admin is browsing a different year's screen, and the
//! money still lands on the row's own year.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, Money, interest_payments::PaymentStatus};

/// Policy default monthly contribution (₱300).
pub const DEFAULT_MONTHLY_CONTRIBUTION: Money = Money::new(300_00);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: Uuid,
    pub member_id: Uuid,
    pub amount: Money,
    pub month: u32,
    pub year: i32,
    pub status: PaymentStatus,
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl Contribution {
    pub(crate) fn new(member_id: Uuid, month: u32, year: i32, amount: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            amount,
            month,
            year,
            status: PaymentStatus::Pending,
            payment_date: None,
            notes: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "contributions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub member_id: String,
    pub amount_minor: i64,
    pub month: i32,
    pub year: i32,
    pub status: String,
    pub payment_date: Option<Date>,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::members::Entity",
        from = "Column::MemberId",
        to = "super::members::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Members,
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Contribution> for ActiveModel {
    fn from(contribution: &Contribution) -> Self {
        Self {
            id: ActiveValue::Set(contribution.id.to_string()),
            member_id: ActiveValue::Set(contribution.member_id.to_string()),
            amount_minor: ActiveValue::Set(contribution.amount.minor()),
            month: ActiveValue::Set(contribution.month as i32),
            year: ActiveValue::Set(contribution.year),
            status: ActiveValue::Set(contribution.status.as_str().to_string()),
            payment_date: ActiveValue::Set(contribution.payment_date),
            notes: ActiveValue::Set(contribution.notes.clone()),
        }
    }
}

impl TryFrom<Model> for Contribution {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::NotFound("contribution not exists".to_string()))?,
            member_id: Uuid::parse_str(&model.member_id)
                .map_err(|_| LedgerError::NotFound("member not exists".to_string()))?,
            amount: Money::new(model.amount_minor),
            month: model.month as u32,
            year: model.year,
            status: PaymentStatus::try_from(model.status.as_str())?,
            payment_date: model.payment_date,
            notes: model.notes,
        })
    }
}
