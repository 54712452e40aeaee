//! Monthly contribution handlers.

use chrono::NaiveDate;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CapitalEntryKind, CapitalSourceKind, Contribution, LedgerError, Money, ResultLedger,
    contributions, contributions::DEFAULT_MONTHLY_CONTRIBUTION, interest_payments::PaymentStatus,
    members,
};

use super::{Engine, month_name, validate_month, validate_year, with_tx};

/// Result of a bulk mark-paid pass over a year.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkContributionReceipt {
    pub marked: usize,
    pub total: Money,
}

impl Engine {
    /// Toggle a member's contribution for (month, year) between pending and
    /// paid, creating the row on first touch.
    ///
    /// The row's stored year is authoritative: the audit entry and the
    /// recompute both go to the row's own year, not the year the caller
    /// happens to be browsing.
    pub async fn set_contribution_status(
        &self,
        member_id: Uuid,
        month: u32,
        year: i32,
        status: PaymentStatus,
        paid_on: NaiveDate,
    ) -> ResultLedger<()> {
        validate_month(month)?;
        validate_year(year)?;
        with_tx!(self, |db_tx| {
            self.set_contribution_status_in(&db_tx, member_id, month, year, status, paid_on)
                .await
        })
    }

    async fn set_contribution_status_in(
        &self,
        db_tx: &DatabaseTransaction,
        member_id: Uuid,
        month: u32,
        year: i32,
        status: PaymentStatus,
        paid_on: NaiveDate,
    ) -> ResultLedger<()> {
        let member_name = self
            .member_display_name(db_tx, &member_id.to_string())
            .await?;

        let existing = contributions::Entity::find()
            .filter(contributions::Column::MemberId.eq(member_id.to_string()))
            .filter(contributions::Column::Month.eq(month as i32))
            .filter(contributions::Column::Year.eq(year))
            .one(db_tx)
            .await?;

        let row = match existing {
            Some(row) => row,
            None => {
                // New row: take the member's amount for this year when one
                // exists, otherwise the policy default.
                let amount = contributions::Entity::find()
                    .filter(contributions::Column::MemberId.eq(member_id.to_string()))
                    .filter(contributions::Column::Year.eq(year))
                    .one(db_tx)
                    .await?
                    .map_or(DEFAULT_MONTHLY_CONTRIBUTION, |m| Money::new(m.amount_minor));
                let fresh = Contribution::new(member_id, month, year, amount);
                contributions::ActiveModel::from(&fresh).insert(db_tx).await?
            }
        };

        let current = PaymentStatus::try_from(row.status.as_str())?;
        if current == status {
            return Ok(());
        }

        // The stored year, not the request parameter, drives accounting.
        let row_year = row.year;
        let amount = Money::new(row.amount_minor);

        match status {
            PaymentStatus::Paid => {
                contributions::ActiveModel {
                    id: ActiveValue::Set(row.id.clone()),
                    status: ActiveValue::Set(PaymentStatus::Paid.as_str().to_string()),
                    payment_date: ActiveValue::Set(Some(row.payment_date.unwrap_or(paid_on))),
                    ..Default::default()
                }
                .update(db_tx)
                .await?;

                self.record_capital_entry(
                    db_tx,
                    row_year,
                    None,
                    CapitalEntryKind::Addition,
                    amount,
                    format!(
                        "Monthly contribution from {member_name} - {} {row_year}",
                        month_name(month)
                    ),
                    Some((CapitalSourceKind::Contribution, row.id.clone())),
                )
                .await?;
            }
            PaymentStatus::Pending => {
                contributions::ActiveModel {
                    id: ActiveValue::Set(row.id.clone()),
                    status: ActiveValue::Set(PaymentStatus::Pending.as_str().to_string()),
                    payment_date: ActiveValue::Set(None),
                    ..Default::default()
                }
                .update(db_tx)
                .await?;

                self.remove_capital_entry(db_tx, CapitalSourceKind::Contribution, &row.id)
                    .await?;
            }
        }

        self.recalc_contributions_collected_in(db_tx, row_year)
            .await?;
        tracing::debug!(
            member = %member_id,
            month,
            year = row_year,
            status = status.as_str(),
            "contribution updated"
        );
        Ok(())
    }

    /// Set the contribution fee for every member for a year.
    ///
    /// Existing rows for the year are updated in place; members without any
    /// row get a pending January row so the new fee is visible. Finishes with
    /// a recompute because paid rows may have changed amount.
    pub async fn set_contribution_amount(&self, year: i32, amount: Money) -> ResultLedger<u64> {
        validate_year(year)?;
        if amount.is_negative() {
            return Err(LedgerError::Validation(
                "contribution amount must be >= 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let mut touched = 0u64;
            let member_rows = members::Entity::find().all(&db_tx).await?;
            for member in member_rows {
                let updated = contributions::Entity::update_many()
                    .col_expr(
                        contributions::Column::AmountMinor,
                        Expr::value(amount.minor()),
                    )
                    .filter(contributions::Column::MemberId.eq(member.id.clone()))
                    .filter(contributions::Column::Year.eq(year))
                    .exec(&db_tx)
                    .await?;
                touched += updated.rows_affected;

                if updated.rows_affected == 0 {
                    let member_id = Uuid::parse_str(&member.id)
                        .map_err(|_| LedgerError::Validation("invalid member id".to_string()))?;
                    let fresh = Contribution::new(member_id, 1, year, amount);
                    contributions::ActiveModel::from(&fresh).insert(&db_tx).await?;
                    touched += 1;
                }
            }
            self.recalc_contributions_collected_in(&db_tx, year).await?;
            tracing::info!(year, %amount, rows = touched, "contribution fee updated for all members");
            Ok(touched)
        })
    }

    /// Mark every pending contribution of a year paid, writing the matching
    /// audit rows, then recompute the collected total once.
    pub async fn mark_contributions_paid(
        &self,
        year: i32,
        paid_on: NaiveDate,
    ) -> ResultLedger<BulkContributionReceipt> {
        validate_year(year)?;
        with_tx!(self, |db_tx| {
            let pending = contributions::Entity::find()
                .filter(contributions::Column::Year.eq(year))
                .filter(contributions::Column::Status.eq(PaymentStatus::Pending.as_str()))
                .all(&db_tx)
                .await?;

            let mut receipt = BulkContributionReceipt::default();
            for row in pending {
                let member_name = self.member_display_name(&db_tx, &row.member_id).await?;
                contributions::ActiveModel {
                    id: ActiveValue::Set(row.id.clone()),
                    status: ActiveValue::Set(PaymentStatus::Paid.as_str().to_string()),
                    payment_date: ActiveValue::Set(Some(row.payment_date.unwrap_or(paid_on))),
                    ..Default::default()
                }
                .update(&db_tx)
                .await?;

                let amount = Money::new(row.amount_minor);
                self.record_capital_entry(
                    &db_tx,
                    row.year,
                    None,
                    CapitalEntryKind::Addition,
                    amount,
                    format!(
                        "Monthly contribution from {member_name} - {} {}",
                        month_name(row.month as u32),
                        row.year
                    ),
                    Some((CapitalSourceKind::Contribution, row.id.clone())),
                )
                .await?;

                receipt.marked += 1;
                receipt.total += amount;
            }

            self.recalc_contributions_collected_in(&db_tx, year).await?;
            tracing::info!(year, marked = receipt.marked, total = %receipt.total, "pending contributions marked paid");
            Ok(receipt)
        })
    }

    /// A member's contribution rows for a year, ordered by month.
    pub async fn list_contributions(
        &self,
        member_id: Uuid,
        year: i32,
    ) -> ResultLedger<Vec<Contribution>> {
        let models = contributions::Entity::find()
            .filter(contributions::Column::MemberId.eq(member_id.to_string()))
            .filter(contributions::Column::Year.eq(year))
            .order_by_asc(contributions::Column::Month)
            .all(&self.database)
            .await?;
        models.into_iter().map(TryInto::try_into).collect()
    }
}
