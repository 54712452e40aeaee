//! Loan lifecycle handlers: create, delete, status steps, year reassignment.
//!
//! Each handler is one transaction: the ledger mutation, the audit row, and
//! the summary recompute commit together or not at all.

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CapitalEntryKind, CapitalSourceKind, CreateLoanCmd, LedgerError, Loan, LoanStatus, Money,
    ResultLedger, advance_payments, capital_transactions, interest_payments,
    interest_payments::{MergeOutcome, PaymentStatus, resolve_duplicate},
    loans,
};

use super::{Engine, validate_year, with_tx};

/// What a year reassignment did to the loan's schedule rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearReassignment {
    /// Schedule rows moved to the new year.
    pub moved: usize,
    /// Rows that collided with an existing (loan, month, new-year) row and
    /// went through the duplicate-merge table.
    pub merged: usize,
    /// Paid interest dropped by both-paid merges. This is the only amount by
    /// which the across-years total is allowed to change.
    pub discarded_paid: Money,
}

impl Engine {
    /// Disburse a new loan.
    ///
    /// Rejects the request when the amount exceeds the year's available
    /// capital; on success inserts the loan, logs the disbursement in the
    /// audit log, and recomputes `money_released` for the year.
    pub async fn create_loan(&self, cmd: CreateLoanCmd) -> ResultLedger<Uuid> {
        validate_year(cmd.year)?;
        let mut loan = Loan::new(
            cmd.borrower,
            cmd.amount,
            cmd.interest_rate_bps,
            Some(cmd.year),
        )?;
        loan.description = cmd.description;
        loan.notes = cmd.notes;

        with_tx!(self, |db_tx| {
            let available = self.available_capital_in(&db_tx, cmd.year).await?;
            if cmd.amount > available {
                return Err(LedgerError::InsufficientCapital {
                    available,
                    requested: cmd.amount,
                });
            }

            let borrower_name = match loan.borrower.non_member_name() {
                Some(name) => {
                    // Non-member loans still need an existing co-maker.
                    self.member_display_name(&db_tx, &loan.borrower.member_id().to_string())
                        .await?;
                    name.to_string()
                }
                None => {
                    self.member_display_name(&db_tx, &loan.borrower.member_id().to_string())
                        .await?
                }
            };

            loans::ActiveModel::from(&loan).insert(&db_tx).await?;

            self.record_capital_entry(
                &db_tx,
                cmd.year,
                Some(loan.id.to_string()),
                CapitalEntryKind::Deduction,
                cmd.amount,
                format!("Loan disbursement to {borrower_name}"),
                Some((CapitalSourceKind::LoanDisbursement, loan.id.to_string())),
            )
            .await?;

            self.recalc_money_released_in(&db_tx, cmd.year).await?;

            tracing::info!(loan = %loan.id, year = cmd.year, amount = %cmd.amount, "loan disbursed");
            Ok(loan.id)
        })
    }

    /// Fetch a loan.
    pub async fn loan(&self, loan_id: Uuid) -> ResultLedger<Loan> {
        let model = self.require_loan(&self.database, loan_id).await?;
        model.try_into()
    }

    /// Step the loan status machine. Moves no money.
    pub async fn set_loan_status(&self, loan_id: Uuid, status: LoanStatus) -> ResultLedger<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_loan(&db_tx, loan_id).await?;
            let current = LoanStatus::try_from(model.status.as_str())?;
            if current != status {
                if !current.can_transition(status) {
                    return Err(LedgerError::Validation(format!(
                        "loan cannot go from {} to {}",
                        current.as_str(),
                        status.as_str()
                    )));
                }
                loans::ActiveModel {
                    id: ActiveValue::Set(model.id),
                    status: ActiveValue::Set(status.as_str().to_string()),
                    ..Default::default()
                }
                .update(&db_tx)
                .await?;
            }
            Ok(())
        })
    }

    /// Delete a loan together with its schedule and advance payments, remove
    /// its disbursement audit row, and recompute the year's totals.
    pub async fn delete_loan(&self, loan_id: Uuid) -> ResultLedger<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_loan(&db_tx, loan_id).await?;
            let year = model.year;
            let id = model.id.clone();

            interest_payments::Entity::delete_many()
                .filter(interest_payments::Column::LoanId.eq(id.clone()))
                .exec(&db_tx)
                .await?;
            advance_payments::Entity::delete_many()
                .filter(advance_payments::Column::LoanId.eq(id.clone()))
                .exec(&db_tx)
                .await?;
            self.remove_capital_entry(&db_tx, CapitalSourceKind::LoanDisbursement, &id)
                .await?;
            loans::Entity::delete_by_id(id.clone()).exec(&db_tx).await?;

            if let Some(year) = year {
                self.recalc_money_released_in(&db_tx, year).await?;
                self.recalc_interest_collected_in(&db_tx, year).await?;
            }
            tracing::info!(loan = %loan_id, "loan deleted");
            Ok(())
        })
    }

    /// Move a loan, its schedule rows, and its audit rows to another ledger
    /// year.
    ///
    /// Total economic value across years is conserved: only the attribution
    /// moves, except for paid rows dropped by both-paid duplicate merges,
    /// which are reported in the returned [`YearReassignment`].
    pub async fn reassign_loan_year(
        &self,
        loan_id: Uuid,
        new_year: i32,
    ) -> ResultLedger<YearReassignment> {
        validate_year(new_year)?;
        with_tx!(self, |db_tx| {
            self.reassign_loan_year_in(&db_tx, loan_id, new_year).await
        })
    }

    async fn reassign_loan_year_in(
        &self,
        db_tx: &DatabaseTransaction,
        loan_id: Uuid,
        new_year: i32,
    ) -> ResultLedger<YearReassignment> {
        let model = self.require_loan(db_tx, loan_id).await?;
        let id = model.id.clone();

        let Some(old_year) = model.year else {
            // First year attribution: no rows to move, just start accounting
            // for the loan.
            let borrower_name = self.borrower_display_name(db_tx, &model).await?;
            loans::ActiveModel {
                id: ActiveValue::Set(id.clone()),
                year: ActiveValue::Set(Some(new_year)),
                ..Default::default()
            }
            .update(db_tx)
            .await?;
            self.record_capital_entry(
                db_tx,
                new_year,
                Some(id.clone()),
                CapitalEntryKind::Deduction,
                Money::new(model.amount_minor),
                format!("Loan disbursement to {borrower_name}"),
                Some((CapitalSourceKind::LoanDisbursement, id.clone())),
            )
            .await?;
            self.recalc_money_released_in(db_tx, new_year).await?;
            self.recalc_interest_collected_in(db_tx, new_year).await?;
            return Ok(YearReassignment::default());
        };

        if old_year == new_year {
            return Ok(YearReassignment::default());
        }

        let mut report = YearReassignment::default();

        // 1. Move the schedule rows, merging on (loan, month, new_year)
        //    collisions.
        let moving = interest_payments::Entity::find()
            .filter(interest_payments::Column::LoanId.eq(id.clone()))
            .filter(interest_payments::Column::Year.eq(old_year))
            .all(db_tx)
            .await?;

        for moved in moving {
            let target = interest_payments::Entity::find()
                .filter(interest_payments::Column::LoanId.eq(id.clone()))
                .filter(interest_payments::Column::Month.eq(moved.month))
                .filter(interest_payments::Column::Year.eq(new_year))
                .one(db_tx)
                .await?;

            let Some(target) = target else {
                interest_payments::ActiveModel {
                    id: ActiveValue::Set(moved.id),
                    year: ActiveValue::Set(new_year),
                    ..Default::default()
                }
                .update(db_tx)
                .await?;
                report.moved += 1;
                continue;
            };

            let moved_status = PaymentStatus::try_from(moved.status.as_str())?;
            let target_status = PaymentStatus::try_from(target.status.as_str())?;
            match resolve_duplicate(moved_status, target_status) {
                MergeOutcome::KeepTargetDiscardPaid => {
                    report.discarded_paid += Money::new(moved.amount_minor);
                }
                MergeOutcome::AdoptMoved => {
                    interest_payments::ActiveModel {
                        id: ActiveValue::Set(target.id.clone()),
                        status: ActiveValue::Set(moved.status.clone()),
                        amount_minor: ActiveValue::Set(moved.amount_minor),
                        payment_date: ActiveValue::Set(moved.payment_date.or(target.payment_date)),
                        notes: ActiveValue::Set(moved.notes.clone().or(target.notes.clone())),
                        ..Default::default()
                    }
                    .update(db_tx)
                    .await?;
                }
                MergeOutcome::KeepTarget => {
                    // Back-fill metadata the target is missing.
                    if target.notes.is_none() && moved.notes.is_some() {
                        interest_payments::ActiveModel {
                            id: ActiveValue::Set(target.id.clone()),
                            notes: ActiveValue::Set(moved.notes.clone()),
                            ..Default::default()
                        }
                        .update(db_tx)
                        .await?;
                    }
                }
            }
            interest_payments::Entity::delete_by_id(moved.id)
                .exec(db_tx)
                .await?;
            report.merged += 1;
        }

        // 2. Move the loan's audit rows.
        capital_transactions::Entity::update_many()
            .col_expr(capital_transactions::Column::Year, Expr::value(new_year))
            .filter(capital_transactions::Column::LoanId.eq(id.clone()))
            .exec(db_tx)
            .await?;

        // 3. The loan's year must change before the recomputes: they query by
        //    the loan's current year and would otherwise miss the rows just
        //    moved.
        loans::ActiveModel {
            id: ActiveValue::Set(id.clone()),
            year: ActiveValue::Set(Some(new_year)),
            ..Default::default()
        }
        .update(db_tx)
        .await?;

        // 4. Recompute both sides.
        self.recalc_money_released_in(db_tx, old_year).await?;
        self.recalc_interest_collected_in(db_tx, old_year).await?;
        self.recalc_money_released_in(db_tx, new_year).await?;
        self.recalc_interest_collected_in(db_tx, new_year).await?;

        tracing::info!(
            loan = %loan_id,
            old_year,
            new_year,
            moved = report.moved,
            merged = report.merged,
            discarded = %report.discarded_paid,
            "loan year reassigned"
        );
        Ok(report)
    }
}
