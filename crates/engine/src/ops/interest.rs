//! Monthly interest schedule handlers.

use chrono::NaiveDate;
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    CapitalEntryKind, CapitalSourceKind, InterestPayment, LedgerError, LoanStatus, Money,
    ResultLedger, interest_payments,
    interest_payments::{PaymentStatus, amount_due},
    loans,
};

use super::{Engine, month_name, validate_month, validate_year, with_tx};

impl Engine {
    /// Make sure the loan has a full 12-row schedule for a year, creating the
    /// missing months from the current remaining balance. January is forced
    /// to zero, including on rows that already exist but drifted.
    ///
    /// Idempotent; returns the year's schedule ordered by month.
    pub async fn ensure_interest_schedule(
        &self,
        loan_id: Uuid,
        year: i32,
    ) -> ResultLedger<Vec<InterestPayment>> {
        validate_year(year)?;
        with_tx!(self, |db_tx| {
            let loan = self.require_loan(&db_tx, loan_id).await?;
            let balance = self.remaining_balance_of(&db_tx, &loan).await?;

            for month in 1..=12u32 {
                let existing = interest_payments::Entity::find()
                    .filter(interest_payments::Column::LoanId.eq(loan.id.clone()))
                    .filter(interest_payments::Column::Month.eq(month as i32))
                    .filter(interest_payments::Column::Year.eq(year))
                    .one(&db_tx)
                    .await?;

                match existing {
                    None => {
                        let row = InterestPayment::new(
                            loan_id,
                            month,
                            year,
                            amount_due(month, balance, loan.interest_rate_bps),
                        );
                        interest_payments::ActiveModel::from(&row)
                            .insert(&db_tx)
                            .await?;
                    }
                    Some(row) if month == 1 && row.amount_minor != 0 => {
                        interest_payments::ActiveModel {
                            id: ActiveValue::Set(row.id),
                            amount_minor: ActiveValue::Set(0),
                            ..Default::default()
                        }
                        .update(&db_tx)
                        .await?;
                    }
                    Some(_) => {}
                }
            }

            self.interest_schedule_in(&db_tx, loan_id, year).await
        })
    }

    /// The loan's schedule rows for a year, ordered by month.
    pub async fn interest_schedule(
        &self,
        loan_id: Uuid,
        year: i32,
    ) -> ResultLedger<Vec<InterestPayment>> {
        self.interest_schedule_in(&self.database, loan_id, year)
            .await
    }

    async fn interest_schedule_in<C: ConnectionTrait>(
        &self,
        db: &C,
        loan_id: Uuid,
        year: i32,
    ) -> ResultLedger<Vec<InterestPayment>> {
        let models = interest_payments::Entity::find()
            .filter(interest_payments::Column::LoanId.eq(loan_id.to_string()))
            .filter(interest_payments::Column::Year.eq(year))
            .order_by_asc(interest_payments::Column::Month)
            .all(db)
            .await?;
        models.into_iter().map(TryInto::try_into).collect()
    }

    /// Toggle a schedule row between pending and paid.
    ///
    /// Marking paid stamps the payment date and writes an `addition` audit
    /// row; marking pending again deletes exactly that row. Both directions
    /// finish by recomputing the collected total for the **payment's own**
    /// stored year, which may differ from the loan's current year for
    /// multi-year loans.
    pub async fn set_interest_status(
        &self,
        loan_id: Uuid,
        month: u32,
        year: i32,
        status: PaymentStatus,
        paid_on: NaiveDate,
    ) -> ResultLedger<()> {
        validate_month(month)?;
        validate_year(year)?;
        with_tx!(self, |db_tx| {
            self.set_interest_status_in(&db_tx, loan_id, month, year, status, paid_on)
                .await
        })
    }

    async fn set_interest_status_in(
        &self,
        db_tx: &DatabaseTransaction,
        loan_id: Uuid,
        month: u32,
        year: i32,
        status: PaymentStatus,
        paid_on: NaiveDate,
    ) -> ResultLedger<()> {
        let loan = self.require_loan(db_tx, loan_id).await?;
        if LoanStatus::try_from(loan.status.as_str())? == LoanStatus::Pending {
            return Err(LedgerError::Validation(
                "interest cannot be collected on a pending loan".to_string(),
            ));
        }

        let payment = interest_payments::Entity::find()
            .filter(interest_payments::Column::LoanId.eq(loan.id.clone()))
            .filter(interest_payments::Column::Month.eq(month as i32))
            .filter(interest_payments::Column::Year.eq(year))
            .one(db_tx)
            .await?
            .ok_or_else(|| LedgerError::NotFound("interest payment not exists".to_string()))?;

        let current = PaymentStatus::try_from(payment.status.as_str())?;
        if current == status {
            return Ok(());
        }

        match status {
            PaymentStatus::Paid => {
                interest_payments::ActiveModel {
                    id: ActiveValue::Set(payment.id.clone()),
                    status: ActiveValue::Set(PaymentStatus::Paid.as_str().to_string()),
                    payment_date: ActiveValue::Set(Some(payment.payment_date.unwrap_or(paid_on))),
                    ..Default::default()
                }
                .update(db_tx)
                .await?;

                let borrower_name = self.borrower_display_name(db_tx, &loan).await?;
                self.record_capital_entry(
                    db_tx,
                    payment.year,
                    Some(loan.id.clone()),
                    CapitalEntryKind::Addition,
                    Money::new(payment.amount_minor),
                    format!(
                        "Interest payment from {borrower_name} - {} {}",
                        month_name(month),
                        payment.year
                    ),
                    Some((CapitalSourceKind::InterestPayment, payment.id.clone())),
                )
                .await?;
            }
            PaymentStatus::Pending => {
                interest_payments::ActiveModel {
                    id: ActiveValue::Set(payment.id.clone()),
                    status: ActiveValue::Set(PaymentStatus::Pending.as_str().to_string()),
                    payment_date: ActiveValue::Set(None),
                    ..Default::default()
                }
                .update(db_tx)
                .await?;

                self.remove_capital_entry(db_tx, CapitalSourceKind::InterestPayment, &payment.id)
                    .await?;
            }
        }

        self.recalc_interest_collected_in(db_tx, payment.year)
            .await?;
        tracing::debug!(
            loan = %loan_id,
            month,
            year = payment.year,
            status = status.as_str(),
            "interest payment updated"
        );
        Ok(())
    }

    /// Recompute the amounts of the loan's still-pending schedule rows from
    /// its current remaining balance, from `from_month` through December of
    /// the loan's target year. Paid rows are never touched.
    pub(crate) async fn reprice_pending_interest(
        &self,
        db_tx: &DatabaseTransaction,
        loan: &loans::Model,
        from_month: u32,
    ) -> ResultLedger<()> {
        let Some(year) = loan.year else {
            return Ok(());
        };
        let balance = self.remaining_balance_of(db_tx, loan).await?;

        let pending = interest_payments::Entity::find()
            .filter(interest_payments::Column::LoanId.eq(loan.id.clone()))
            .filter(interest_payments::Column::Year.eq(year))
            .filter(interest_payments::Column::Month.gte(from_month as i32))
            .filter(interest_payments::Column::Status.eq(PaymentStatus::Pending.as_str()))
            .all(db_tx)
            .await?;

        for row in pending {
            let amount = amount_due(row.month as u32, balance, loan.interest_rate_bps);
            if amount.minor() != row.amount_minor {
                interest_payments::ActiveModel {
                    id: ActiveValue::Set(row.id),
                    amount_minor: ActiveValue::Set(amount.minor()),
                    ..Default::default()
                }
                .update(db_tx)
                .await?;
            }
        }
        Ok(())
    }
}
