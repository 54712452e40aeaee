//! Per-year summary access and the recompute functions.
//!
//! All cached totals are derived by full resums over the source rows. The
//! recompute functions are idempotent, so the remedial action for any doubt
//! about a cached value is simply to run them again.

use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::{
    CashFlow, LedgerError, Money, ResultLedger, capital_deductions, cash_flows,
    interest_payments::PaymentStatus, loans,
};

use super::{Engine, sum_minor, validate_year, with_tx};

impl Engine {
    /// Fetch the summary row for a year, creating a zeroed one on first
    /// access.
    pub async fn summary(&self, year: i32) -> ResultLedger<CashFlow> {
        self.summary_in(&self.database, year).await
    }

    pub(crate) async fn summary_in<C: ConnectionTrait>(
        &self,
        db: &C,
        year: i32,
    ) -> ResultLedger<CashFlow> {
        validate_year(year)?;
        if let Some(model) = cash_flows::Entity::find_by_id(year).one(db).await? {
            return Ok(model.into());
        }
        // Insert can lose a get-or-create race against the unique `year`
        // key; re-select before giving up.
        match cash_flows::zeroed(year).insert(db).await {
            Ok(model) => Ok(model.into()),
            Err(err) => match cash_flows::Entity::find_by_id(year).one(db).await? {
                Some(model) => Ok(model.into()),
                None => Err(err.into()),
            },
        }
    }

    /// Set the manually seeded capital for a year.
    pub async fn set_capital(&self, year: i32, amount: Money) -> ResultLedger<()> {
        if amount.is_negative() {
            return Err(LedgerError::Validation(
                "capital must be >= 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            self.summary_in(&db_tx, year).await?;
            cash_flows::ActiveModel {
                year: ActiveValue::Set(year),
                capital_minor: ActiveValue::Set(amount.minor()),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            tracing::info!(year, %amount, "capital seed updated");
            Ok(())
        })
    }

    /// Set the manual interest baseline for a year and fold it into the
    /// collected total.
    pub async fn set_interest_base(&self, year: i32, amount: Money) -> ResultLedger<CashFlow> {
        if amount.is_negative() {
            return Err(LedgerError::Validation(
                "interest base must be >= 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            self.summary_in(&db_tx, year).await?;
            cash_flows::ActiveModel {
                year: ActiveValue::Set(year),
                interest_collected_base_minor: ActiveValue::Set(amount.minor()),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            self.recalc_interest_collected_in(&db_tx, year).await?;
            let summary = self.summary_in(&db_tx, year).await?;
            tracing::info!(year, %amount, "interest baseline updated");
            Ok(summary)
        })
    }

    /// Recompute all cached totals for a year.
    pub async fn recalculate_year(&self, year: i32) -> ResultLedger<CashFlow> {
        with_tx!(self, |db_tx| {
            self.recalc_money_released_in(&db_tx, year).await?;
            self.recalc_interest_collected_in(&db_tx, year).await?;
            self.recalc_contributions_collected_in(&db_tx, year).await?;
            self.summary_in(&db_tx, year).await
        })
    }

    /// Recompute the year's collected interest from the paid schedule rows.
    pub async fn recalc_interest_collected(&self, year: i32) -> ResultLedger<Money> {
        with_tx!(self, |db_tx| {
            self.recalc_interest_collected_in(&db_tx, year).await
        })
    }

    /// Recompute the year's collected contributions from the paid rows.
    pub async fn recalc_contributions_collected(&self, year: i32) -> ResultLedger<Money> {
        with_tx!(self, |db_tx| {
            self.recalc_contributions_collected_in(&db_tx, year).await
        })
    }

    /// `money_released(year)` = sum of loan principal attributed to the year.
    /// Always a full resum, never an increment.
    pub(crate) async fn recalc_money_released_in<C: ConnectionTrait>(
        &self,
        db: &C,
        year: i32,
    ) -> ResultLedger<Money> {
        let total = sum_minor(
            db,
            "SELECT COALESCE(SUM(amount_minor), 0) AS sum FROM loans WHERE year = ?",
            vec![year.into()],
        )
        .await?;
        self.summary_in(db, year).await?;
        cash_flows::ActiveModel {
            year: ActiveValue::Set(year),
            money_released_minor: ActiveValue::Set(total),
            ..Default::default()
        }
        .update(db)
        .await?;
        Ok(Money::new(total))
    }

    /// `interest_collected(year)` = manual baseline + paid schedule rows.
    ///
    /// Both year filters are required: a payment only counts when the owning
    /// loan and the payment row agree on the year, which guards against stale
    /// rows while a loan's year is being moved.
    pub(crate) async fn recalc_interest_collected_in<C: ConnectionTrait>(
        &self,
        db: &C,
        year: i32,
    ) -> ResultLedger<Money> {
        let paid = self.paid_interest_total_in(db, year).await?;
        let base = self.summary_in(db, year).await?.interest_collected_base;
        let total = base + Money::new(paid);
        cash_flows::ActiveModel {
            year: ActiveValue::Set(year),
            interest_collected_minor: ActiveValue::Set(total.minor()),
            ..Default::default()
        }
        .update(db)
        .await?;
        Ok(total)
    }

    pub(crate) async fn paid_interest_total_in<C: ConnectionTrait>(
        &self,
        db: &C,
        year: i32,
    ) -> ResultLedger<i64> {
        sum_minor(
            db,
            "SELECT COALESCE(SUM(p.amount_minor), 0) AS sum \
             FROM interest_payments p \
             INNER JOIN loans l ON p.loan_id = l.id \
             WHERE p.status = ? AND l.year = ? AND p.year = ?",
            vec![PaymentStatus::Paid.as_str().into(), year.into(), year.into()],
        )
        .await
    }

    /// `monthly_contributions_collected(year)` = paid contribution rows.
    pub(crate) async fn recalc_contributions_collected_in<C: ConnectionTrait>(
        &self,
        db: &C,
        year: i32,
    ) -> ResultLedger<Money> {
        let total = sum_minor(
            db,
            "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
             FROM contributions WHERE year = ? AND status = ?",
            vec![year.into(), PaymentStatus::Paid.as_str().into()],
        )
        .await?;
        self.summary_in(db, year).await?;
        cash_flows::ActiveModel {
            year: ActiveValue::Set(year),
            monthly_contributions_collected_minor: ActiveValue::Set(total),
            ..Default::default()
        }
        .update(db)
        .await?;
        Ok(Money::new(total))
    }

    /// Sum of the year's remaining loan balances, each clamped at zero.
    pub async fn total_loan_balances(&self, year: i32) -> ResultLedger<Money> {
        self.total_loan_balances_in(&self.database, year).await
    }

    pub(crate) async fn total_loan_balances_in<C: ConnectionTrait>(
        &self,
        db: &C,
        year: i32,
    ) -> ResultLedger<Money> {
        let loan_models = loans::Entity::find()
            .filter(loans::Column::Year.eq(year))
            .all(db)
            .await?;

        let mut total = Money::ZERO;
        for loan in loan_models {
            let advances = sum_minor(
                db,
                "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
                 FROM advance_payments WHERE loan_id = ?",
                vec![loan.id.into()],
            )
            .await?;
            total += Money::new((loan.amount_minor - advances).max(0));
        }
        Ok(total)
    }

    pub(crate) async fn total_deductions_in<C: ConnectionTrait>(
        &self,
        db: &C,
        year: i32,
    ) -> ResultLedger<Money> {
        let total = sum_minor(
            db,
            "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
             FROM capital_deductions WHERE year = ?",
            vec![year.into()],
        )
        .await?;
        Ok(Money::new(total))
    }

    /// Capital usable for approving new loans.
    ///
    /// `max(0, interest_collected + contributions_collected − remaining loan
    /// balances − deductions)`. This is the single formula every consumer
    /// (loan guard, reports, CLI) goes through; the loan-balance and
    /// deduction components are always recomputed from current rows.
    pub async fn available_capital(&self, year: i32) -> ResultLedger<Money> {
        self.available_capital_in(&self.database, year).await
    }

    pub(crate) async fn available_capital_in<C: ConnectionTrait>(
        &self,
        db: &C,
        year: i32,
    ) -> ResultLedger<Money> {
        let summary = self.summary_in(db, year).await?;
        let loan_balances = self.total_loan_balances_in(db, year).await?;
        let deductions = self.total_deductions_in(db, year).await?;

        let available = summary.interest_collected + summary.monthly_contributions_collected
            - loan_balances
            - deductions;
        Ok(available.max(Money::ZERO))
    }

    /// Base capital: manual seed plus collected inflows, before loan
    /// exposure.
    pub async fn base_capital(&self, year: i32) -> ResultLedger<Money> {
        let summary = self.summary_in(&self.database, year).await?;
        Ok(summary.base_capital())
    }

    /// Remaining balance of a loan: principal minus advance payments,
    /// clamped at zero.
    pub async fn remaining_balance(&self, loan_id: uuid::Uuid) -> ResultLedger<Money> {
        let loan = self.require_loan(&self.database, loan_id).await?;
        self.remaining_balance_of(&self.database, &loan).await
    }

    pub(crate) async fn remaining_balance_of<C: ConnectionTrait>(
        &self,
        db: &C,
        loan: &loans::Model,
    ) -> ResultLedger<Money> {
        let advances = sum_minor(
            db,
            "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
             FROM advance_payments WHERE loan_id = ?",
            vec![loan.id.clone().into()],
        )
        .await?;
        Ok(Money::new((loan.amount_minor - advances).max(0)))
    }

    /// Years with a summary row, ascending.
    pub async fn years(&self) -> ResultLedger<Vec<i32>> {
        let models = cash_flows::Entity::find()
            .order_by_asc(cash_flows::Column::Year)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(|m| m.year).collect())
    }

    /// The year's manual deductions, ordered by month.
    pub async fn list_deductions(
        &self,
        year: i32,
    ) -> ResultLedger<Vec<crate::capital_deductions::Deduction>> {
        let models = capital_deductions::Entity::find()
            .filter(capital_deductions::Column::Year.eq(year))
            .order_by_asc(capital_deductions::Column::Month)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}
