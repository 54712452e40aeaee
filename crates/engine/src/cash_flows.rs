//! The per-year cash-flow summary.
//!
//! One row per calendar year, created lazily on first access. The collected
//! totals (`interest_collected`, `monthly_contributions_collected`,
//! `money_released`) are caches over the underlying payment and loan rows and
//! are only ever written by the full-resum recompute functions; `capital` and
//! `interest_collected_base` are manual baselines an admin seeds explicitly.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::Money;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlow {
    pub year: i32,
    /// Manually seeded base capital, independent of the computed flows.
    pub capital: Money,
    /// `interest_collected_base` plus all paid interest for the year.
    pub interest_collected: Money,
    /// Manual override baseline added into `interest_collected`.
    pub interest_collected_base: Money,
    /// Sum of paid contributions for the year.
    pub monthly_contributions_collected: Money,
    /// Sum of loan principal attributed to the year.
    pub money_released: Money,
}

impl CashFlow {
    /// Base capital: the manual seed plus collected inflows, before loan
    /// exposure is deducted.
    #[must_use]
    pub fn base_capital(&self) -> Money {
        self.capital + self.interest_collected + self.monthly_contributions_collected
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cash_flows")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub year: i32,
    pub capital_minor: i64,
    pub interest_collected_minor: i64,
    pub interest_collected_base_minor: i64,
    pub monthly_contributions_collected_minor: i64,
    pub money_released_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for CashFlow {
    fn from(model: Model) -> Self {
        Self {
            year: model.year,
            capital: Money::new(model.capital_minor),
            interest_collected: Money::new(model.interest_collected_minor),
            interest_collected_base: Money::new(model.interest_collected_base_minor),
            monthly_contributions_collected: Money::new(
                model.monthly_contributions_collected_minor,
            ),
            money_released: Money::new(model.money_released_minor),
        }
    }
}

pub(crate) fn zeroed(year: i32) -> ActiveModel {
    ActiveModel {
        year: ActiveValue::Set(year),
        capital_minor: ActiveValue::Set(0),
        interest_collected_minor: ActiveValue::Set(0),
        interest_collected_base_minor: ActiveValue::Set(0),
        monthly_contributions_collected_minor: ActiveValue::Set(0),
        money_released_minor: ActiveValue::Set(0),
    }
}
