//! Read-only views for the presentation layers.
//!
//! Everything here funnels through the same recompute/derive functions the
//! mutation handlers use, so the dashboard, the capital page, and the CLI can
//! never disagree with the loan-creation guard.

use sea_orm::{ConnectionTrait, Statement};
use serde::{Deserialize, Serialize};

use crate::{Money, ResultLedger, interest_payments::PaymentStatus};

use super::{Engine, sum_minor, validate_year};

/// One year of the capital and cash-flow picture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearReport {
    pub year: i32,
    /// Manual capital seed.
    pub capital: Money,
    pub base_capital: Money,
    pub available_capital: Money,
    pub interest_collected: Money,
    pub interest_collected_base: Money,
    pub contributions_collected: Money,
    pub money_released: Money,
    pub total_loan_balances: Money,
    pub total_deductions: Money,
}

/// Paid interest per month, for verification breakdowns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthTotal {
    pub month: u32,
    pub payments: usize,
    pub total: Money,
}

/// Cached vs recomputed interest for a year.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestVerification {
    pub year: i32,
    /// The value currently cached on the summary row.
    pub cached: Money,
    /// The manual baseline folded into the cache.
    pub base: Money,
    /// Paid schedule rows recomputed right now.
    pub actual: Money,
    pub paid_payments: usize,
    pub by_month: Vec<MonthTotal>,
}

impl InterestVerification {
    /// True when the cached total equals baseline + recomputed payments.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.cached == self.base + self.actual
    }
}

impl Engine {
    /// The full capital picture for a year.
    pub async fn year_report(&self, year: i32) -> ResultLedger<YearReport> {
        validate_year(year)?;
        let db = &self.database;
        let summary = self.summary_in(db, year).await?;
        let total_loan_balances = self.total_loan_balances_in(db, year).await?;
        let total_deductions = self.total_deductions_in(db, year).await?;
        let available_capital = self.available_capital_in(db, year).await?;

        Ok(YearReport {
            year,
            capital: summary.capital,
            base_capital: summary.base_capital(),
            available_capital,
            interest_collected: summary.interest_collected,
            interest_collected_base: summary.interest_collected_base,
            contributions_collected: summary.monthly_contributions_collected,
            money_released: summary.money_released,
            total_loan_balances,
            total_deductions,
        })
    }

    /// Compare the cached interest total against a fresh recomputation, with
    /// a per-month breakdown of the paid rows.
    pub async fn verify_interest_collected(
        &self,
        year: i32,
    ) -> ResultLedger<InterestVerification> {
        validate_year(year)?;
        let db = &self.database;
        let summary = self.summary_in(db, year).await?;
        let actual = Money::new(self.paid_interest_total_in(db, year).await?);
        let paid_payments = self.paid_interest_rows(db, year).await?;

        let mut by_month: Vec<MonthTotal> = Vec::new();
        for (month, amount_minor) in &paid_payments {
            match by_month.iter_mut().find(|entry| entry.month == *month) {
                Some(entry) => {
                    entry.payments += 1;
                    entry.total += Money::new(*amount_minor);
                }
                None => by_month.push(MonthTotal {
                    month: *month,
                    payments: 1,
                    total: Money::new(*amount_minor),
                }),
            }
        }
        by_month.sort_by_key(|entry| entry.month);

        Ok(InterestVerification {
            year,
            cached: summary.interest_collected,
            base: summary.interest_collected_base,
            actual,
            paid_payments: paid_payments.len(),
            by_month,
        })
    }

    async fn paid_interest_rows<C: ConnectionTrait>(
        &self,
        db: &C,
        year: i32,
    ) -> ResultLedger<Vec<(u32, i64)>> {
        let backend = db.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT p.month AS month, p.amount_minor AS amount_minor \
             FROM interest_payments p \
             INNER JOIN loans l ON p.loan_id = l.id \
             WHERE p.status = ? AND l.year = ? AND p.year = ? \
             ORDER BY p.month",
            vec![PaymentStatus::Paid.as_str().into(), year.into(), year.into()],
        );
        let rows = db.query_all(stmt).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let month: i32 = row.try_get("", "month")?;
            let amount_minor: i64 = row.try_get("", "amount_minor")?;
            out.push((month as u32, amount_minor));
        }
        Ok(out)
    }

    /// Sum of available capital over every known year.
    pub async fn total_available_capital(&self) -> ResultLedger<Money> {
        let mut total = Money::ZERO;
        for year in self.years().await? {
            total += self.available_capital(year).await?;
        }
        Ok(total)
    }

    /// Sum of released principal over every known year.
    pub async fn total_money_released(&self) -> ResultLedger<Money> {
        let total = sum_minor(
            &self.database,
            "SELECT COALESCE(SUM(money_released_minor), 0) AS sum FROM cash_flows",
            vec![],
        )
        .await?;
        Ok(Money::new(total))
    }
}
