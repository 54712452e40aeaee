//! Manual deduction handlers.

use sea_orm::{QueryFilter, TransactionTrait, prelude::*};

use crate::{AddDeductionCmd, LedgerError, ResultLedger, capital_deductions};

use super::{Engine, month_name, validate_month, validate_year, with_tx};

impl Engine {
    /// Record a manual deduction for (year, month).
    ///
    /// At most one per month unless the command carries `force`; the
    /// duplicate answer includes the month so callers can offer the
    /// override.
    pub async fn add_deduction(&self, cmd: AddDeductionCmd) -> ResultLedger<i64> {
        validate_year(cmd.year)?;
        validate_month(cmd.month)?;
        if !cmd.amount.is_positive() {
            return Err(LedgerError::Validation(
                "deduction amount must be > 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            if !cmd.force {
                let exists = capital_deductions::Entity::find()
                    .filter(capital_deductions::Column::Year.eq(cmd.year))
                    .filter(capital_deductions::Column::Month.eq(cmd.month as i32))
                    .one(&db_tx)
                    .await?
                    .is_some();
                if exists {
                    return Err(LedgerError::Duplicate(format!(
                        "deduction for {} {}",
                        month_name(cmd.month),
                        cmd.year
                    )));
                }
            }

            let model = capital_deductions::row(
                cmd.year,
                cmd.month,
                cmd.amount,
                cmd.description.clone(),
                cmd.recorded_by,
            )
            .insert(&db_tx)
            .await?;

            tracing::info!(year = cmd.year, month = cmd.month, amount = %cmd.amount, "capital deduction recorded");
            Ok(model.id)
        })
    }

    /// Remove a deduction, freeing its (year, month) for a new one.
    pub async fn undo_deduction(&self, deduction_id: i64) -> ResultLedger<()> {
        with_tx!(self, |db_tx| {
            let result = capital_deductions::Entity::delete_by_id(deduction_id)
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(LedgerError::NotFound("deduction not exists".to_string()));
            }
            tracing::info!(deduction = deduction_id, "capital deduction undone");
            Ok(())
        })
    }
}
