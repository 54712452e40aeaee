use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, Statement, Value, prelude::*,
};
use uuid::Uuid;

use crate::{LedgerError, ResultLedger, members};

mod advances;
mod audit;
mod contributions;
mod deductions;
mod interest;
mod loans;
mod reports;
mod summary;

pub use contributions::BulkContributionReceipt;
pub use loans::YearReassignment;
pub use reports::{InterestVerification, MonthTotal, YearReport};

pub(crate) const MIN_YEAR: i32 = 2000;
pub(crate) const MAX_YEAR: i32 = 2100;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub(crate) async fn require_loan<C: ConnectionTrait>(
        &self,
        db: &C,
        loan_id: Uuid,
    ) -> ResultLedger<crate::loans::Model> {
        crate::loans::Entity::find_by_id(loan_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| LedgerError::NotFound("loan not exists".to_string()))
    }

    pub(crate) async fn member_display_name(
        &self,
        db: &DatabaseTransaction,
        member_id: &str,
    ) -> ResultLedger<String> {
        members::Entity::find_by_id(member_id.to_string())
            .one(db)
            .await?
            .map(|member| member.display_name())
            .ok_or_else(|| LedgerError::NotFound("member not exists".to_string()))
    }

    /// Display name for the audit log: the non-member name when set,
    /// otherwise the owning member's name.
    pub(crate) async fn borrower_display_name(
        &self,
        db: &DatabaseTransaction,
        loan: &crate::loans::Model,
    ) -> ResultLedger<String> {
        if let Some(name) = &loan.non_member_name {
            return Ok(name.clone());
        }
        match &loan.member_id {
            Some(member_id) => self.member_display_name(db, member_id).await,
            None => Ok("Unknown".to_string()),
        }
    }
}

pub(crate) fn validate_year(year: i32) -> ResultLedger<()> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(LedgerError::Validation(format!(
            "year must be between {MIN_YEAR} and {MAX_YEAR}, got {year}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_month(month: u32) -> ResultLedger<()> {
    if !(1..=12).contains(&month) {
        return Err(LedgerError::Validation(format!(
            "month must be between 1 and 12, got {month}"
        )));
    }
    Ok(())
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// English month name for audit descriptions. Callers validate the range
/// first; out-of-range values fall back to a numeric label only to keep this
/// infallible.
pub(crate) fn month_name(month: u32) -> String {
    MONTH_NAMES
        .get(month.wrapping_sub(1) as usize)
        .map_or_else(|| format!("Month {month}"), |name| (*name).to_string())
}

/// `COALESCE(SUM(...), 0)` helper over a raw statement selecting one `sum`
/// column.
pub(crate) async fn sum_minor<C: ConnectionTrait>(
    db: &C,
    sql: &str,
    values: Vec<Value>,
) -> ResultLedger<i64> {
    let backend = db.get_database_backend();
    let stmt = Statement::from_sql_and_values(backend, sql, values);
    let row = db.query_one(stmt).await?;
    let sum: i64 = match row {
        Some(row) => row.try_get("", "sum").unwrap_or(0),
        None => 0,
    };
    Ok(sum)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultLedger<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
