//! Advance payment handlers.
//!
//! Advance payments never enter available capital directly: they raise it by
//! shrinking the loan's remaining balance. No audit row is written for them.

use chrono::{Datelike, NaiveDate};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    AdvancePayment, LedgerError, Money, RecordAdvancePaymentCmd, ResultLedger, advance_payments,
    loans,
};

use super::{Engine, with_tx};

impl Engine {
    /// Record an out-of-schedule principal payment: insert the row, lower the
    /// loan balance (floor 0), and reprice the pending interest schedule from
    /// the payment-date month onwards.
    pub async fn record_advance_payment(
        &self,
        cmd: RecordAdvancePaymentCmd,
    ) -> ResultLedger<Uuid> {
        if !cmd.amount.is_positive() {
            return Err(LedgerError::Validation(
                "advance payment amount must be > 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let loan = self.require_loan(&db_tx, cmd.loan_id).await?;

            let payment =
                AdvancePayment::new(cmd.loan_id, cmd.amount, cmd.payment_date, cmd.notes.clone());
            advance_payments::ActiveModel::from(&payment)
                .insert(&db_tx)
                .await?;

            let new_balance = Money::new(loan.balance_minor)
                .checked_sub(cmd.amount)
                .unwrap_or(Money::ZERO)
                .max(Money::ZERO);
            loans::ActiveModel {
                id: ActiveValue::Set(loan.id.clone()),
                balance_minor: ActiveValue::Set(new_balance.minor()),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;

            self.reprice_pending_interest(&db_tx, &loan, cmd.payment_date.month())
                .await?;

            tracing::debug!(loan = %cmd.loan_id, amount = %cmd.amount, balance = %new_balance, "advance payment recorded");
            Ok(payment.id)
        })
    }

    /// Revert (delete) an advance payment: restore the loan balance (ceiling
    /// the principal) and reprice the pending schedule from the effective
    /// date's month onwards.
    ///
    /// The payment must belong to the stated loan.
    pub async fn revert_advance_payment(
        &self,
        loan_id: Uuid,
        payment_id: Uuid,
        effective_date: NaiveDate,
    ) -> ResultLedger<()> {
        with_tx!(self, |db_tx| {
            let loan = self.require_loan(&db_tx, loan_id).await?;
            let payment = advance_payments::Entity::find_by_id(payment_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| LedgerError::NotFound("advance payment not exists".to_string()))?;
            if payment.loan_id != loan.id {
                return Err(LedgerError::NotFound(
                    "advance payment does not belong to this loan".to_string(),
                ));
            }

            advance_payments::Entity::delete_by_id(payment.id.clone())
                .exec(&db_tx)
                .await?;

            let restored = Money::new(loan.balance_minor + payment.amount_minor)
                .min(Money::new(loan.amount_minor));
            loans::ActiveModel {
                id: ActiveValue::Set(loan.id.clone()),
                balance_minor: ActiveValue::Set(restored.minor()),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;

            self.reprice_pending_interest(&db_tx, &loan, effective_date.month())
                .await?;

            tracing::debug!(loan = %loan_id, payment = %payment_id, balance = %restored, "advance payment reverted");
            Ok(())
        })
    }

    /// The loan's advance payments, newest payment date first.
    pub async fn list_advance_payments(&self, loan_id: Uuid) -> ResultLedger<Vec<AdvancePayment>> {
        let models = advance_payments::Entity::find()
            .filter(advance_payments::Column::LoanId.eq(loan_id.to_string()))
            .order_by_desc(advance_payments::Column::PaymentDate)
            .all(&self.database)
            .await?;
        models.into_iter().map(TryInto::try_into).collect()
    }
}
