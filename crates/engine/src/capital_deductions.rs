//! Manual capital deduction rows.
//!
//! A small recurring fee an admin records against a (year, month), e.g. the
//! ₱15 service charge. Deductions subtract directly in the available-capital
//! formula; they never touch the manual capital seed and never write audit
//! rows. At most one per (year, month) unless explicitly forced.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Money;

/// Default monthly administrative fee (₱15).
pub const DEFAULT_MONTHLY_FEE: Money = Money::new(15_00);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deduction {
    pub id: i64,
    pub year: i32,
    pub month: u32,
    pub amount: Money,
    pub description: Option<String>,
    pub recorded_by: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "capital_deductions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub year: i32,
    pub month: i32,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub recorded_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Deduction {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            year: model.year,
            month: model.month as u32,
            amount: Money::new(model.amount_minor),
            description: model.description,
            recorded_by: model
                .recorded_by
                .as_deref()
                .and_then(|id| Uuid::parse_str(id).ok()),
        }
    }
}

pub(crate) fn row(
    year: i32,
    month: u32,
    amount: Money,
    description: Option<String>,
    recorded_by: Option<Uuid>,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        year: ActiveValue::Set(year),
        month: ActiveValue::Set(month as i32),
        amount_minor: ActiveValue::Set(amount.minor()),
        description: ActiveValue::Set(description),
        recorded_by: ActiveValue::Set(recorded_by.map(|id| id.to_string())),
    }
}
