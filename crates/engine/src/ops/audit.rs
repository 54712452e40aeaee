//! Capital audit log writes and reads.
//!
//! Rows are tagged with their source at creation time so a reversal deletes
//! exactly the row the original event wrote.

use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};

use crate::{
    CapitalEntryKind, CapitalSourceKind, CapitalTransaction, Money, ResultLedger,
    capital_transactions,
};

use super::Engine;

impl Engine {
    pub(crate) async fn record_capital_entry(
        &self,
        db_tx: &DatabaseTransaction,
        year: i32,
        loan_id: Option<String>,
        kind: CapitalEntryKind,
        amount: Money,
        description: String,
        source: Option<(CapitalSourceKind, String)>,
    ) -> ResultLedger<()> {
        capital_transactions::entry(year, loan_id, kind, amount, description, source)
            .insert(db_tx)
            .await?;
        Ok(())
    }

    /// Delete the audit row(s) written for a source event. Exact lookup on
    /// the tag; returns the number of rows removed.
    pub(crate) async fn remove_capital_entry(
        &self,
        db_tx: &DatabaseTransaction,
        source_kind: CapitalSourceKind,
        source_id: &str,
    ) -> ResultLedger<u64> {
        let result = capital_transactions::Entity::delete_many()
            .filter(capital_transactions::Column::SourceKind.eq(source_kind.as_str()))
            .filter(capital_transactions::Column::SourceId.eq(source_id))
            .exec(db_tx)
            .await?;
        Ok(result.rows_affected)
    }

    /// The year's audit rows, newest first.
    pub async fn list_capital_transactions(
        &self,
        year: i32,
    ) -> ResultLedger<Vec<CapitalTransaction>> {
        let models = capital_transactions::Entity::find()
            .filter(capital_transactions::Column::Year.eq(year))
            .order_by_desc(capital_transactions::Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(TryInto::try_into).collect()
    }
}
