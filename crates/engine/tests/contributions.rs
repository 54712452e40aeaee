use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, Statement};
use uuid::Uuid;

use engine::{
    AddDeductionCmd, CapitalEntryKind, CapitalSourceKind, Engine, LedgerError, Money,
    PaymentStatus, DEFAULT_MONTHLY_CONTRIBUTION,
};
use migration::MigratorTrait;

const ALICE: &str = "11111111-1111-4111-8111-111111111111";
const BEN: &str = "22222222-2222-4222-8222-222222222222";

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for (id, first, last, email) in [
        (ALICE, "Alice", "Reyes", "alice@example.com"),
        (BEN, "Ben", "Santos", "ben@example.com"),
    ] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO members (id, first_name, last_name, email, active) VALUES (?, ?, ?, ?, ?)",
            vec![id.into(), first.into(), last.into(), email.into(), true.into()],
        ))
        .await
        .unwrap();
    }
    Engine::builder().database(db).build().await.unwrap()
}

fn member(id: &str) -> Uuid {
    Uuid::parse_str(id).unwrap()
}

fn pesos(amount: i64) -> Money {
    Money::new(amount * 100)
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

#[tokio::test]
async fn toggle_updates_summary_and_audit_log_both_ways() {
    let engine = engine_with_db().await;

    engine
        .set_contribution_status(member(ALICE), 2, 2025, PaymentStatus::Paid, date(2025, 2, 5))
        .await
        .unwrap();

    let summary = engine.summary(2025).await.unwrap();
    assert_eq!(
        summary.monthly_contributions_collected,
        DEFAULT_MONTHLY_CONTRIBUTION
    );
    let transactions = engine.list_capital_transactions(2025).await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].kind, CapitalEntryKind::Addition);
    assert_eq!(transactions[0].source_kind, Some(CapitalSourceKind::Contribution));
    assert!(transactions[0].description.contains("Alice Reyes"));
    assert!(transactions[0].description.contains("February"));

    // Marking pending again reverses both exactly.
    engine
        .set_contribution_status(
            member(ALICE),
            2,
            2025,
            PaymentStatus::Pending,
            date(2025, 2, 5),
        )
        .await
        .unwrap();
    let summary = engine.summary(2025).await.unwrap();
    assert_eq!(summary.monthly_contributions_collected, Money::ZERO);
    assert!(engine.list_capital_transactions(2025).await.unwrap().is_empty());
}

#[tokio::test]
async fn new_rows_inherit_the_member_year_amount() {
    let engine = engine_with_db().await;
    engine.set_contribution_amount(2025, pesos(500)).await.unwrap();

    engine
        .set_contribution_status(member(ALICE), 7, 2025, PaymentStatus::Paid, date(2025, 7, 3))
        .await
        .unwrap();

    let rows = engine.list_contributions(member(ALICE), 2025).await.unwrap();
    let july = rows.iter().find(|row| row.month == 7).unwrap();
    assert_eq!(july.amount, pesos(500));
    assert_eq!(
        engine.summary(2025).await.unwrap().monthly_contributions_collected,
        pesos(500)
    );
}

#[tokio::test]
async fn the_contribution_row_year_is_authoritative() {
    let engine = engine_with_db().await;

    // Paying a 2024 row while other work happens in 2025 must credit 2024.
    engine
        .set_contribution_status(member(ALICE), 11, 2024, PaymentStatus::Paid, date(2025, 1, 8))
        .await
        .unwrap();
    engine.summary(2025).await.unwrap();

    assert_eq!(
        engine.summary(2024).await.unwrap().monthly_contributions_collected,
        DEFAULT_MONTHLY_CONTRIBUTION
    );
    assert_eq!(
        engine.summary(2025).await.unwrap().monthly_contributions_collected,
        Money::ZERO
    );
    let transactions = engine.list_capital_transactions(2024).await.unwrap();
    assert_eq!(transactions.len(), 1);
}

#[tokio::test]
async fn fee_update_recomputes_already_paid_rows() {
    let engine = engine_with_db().await;
    engine
        .set_contribution_status(member(ALICE), 1, 2025, PaymentStatus::Paid, date(2025, 1, 5))
        .await
        .unwrap();
    assert_eq!(
        engine.summary(2025).await.unwrap().monthly_contributions_collected,
        DEFAULT_MONTHLY_CONTRIBUTION
    );

    // Raising the fee rewrites the year's rows and the collected total
    // follows, including the already-paid January.
    engine.set_contribution_amount(2025, pesos(400)).await.unwrap();
    assert_eq!(
        engine.summary(2025).await.unwrap().monthly_contributions_collected,
        pesos(400)
    );

    // Ben had no rows: he gets a pending January seeded with the new fee.
    let rows = engine.list_contributions(member(BEN), 2025).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].month, 1);
    assert_eq!(rows[0].amount, pesos(400));
    assert_eq!(rows[0].status, PaymentStatus::Pending);
}

#[tokio::test]
async fn bulk_mark_paid_collects_everything_once() {
    let engine = engine_with_db().await;
    engine.set_contribution_amount(2025, pesos(300)).await.unwrap();
    engine
        .set_contribution_status(member(ALICE), 2, 2025, PaymentStatus::Pending, date(2025, 2, 1))
        .await
        .unwrap();

    let receipt = engine
        .mark_contributions_paid(2025, date(2025, 12, 31))
        .await
        .unwrap();
    // Alice: January (seeded) + February; Ben: January.
    assert_eq!(receipt.marked, 3);
    assert_eq!(receipt.total, pesos(900));

    let summary = engine.summary(2025).await.unwrap();
    assert_eq!(summary.monthly_contributions_collected, pesos(900));
    assert_eq!(engine.list_capital_transactions(2025).await.unwrap().len(), 3);

    // Nothing left to mark; running again is a no-op.
    let receipt = engine
        .mark_contributions_paid(2025, date(2025, 12, 31))
        .await
        .unwrap();
    assert_eq!(receipt.marked, 0);
    assert_eq!(
        engine.summary(2025).await.unwrap().monthly_contributions_collected,
        pesos(900)
    );
}

#[tokio::test]
async fn duplicate_deduction_needs_force() {
    let engine = engine_with_db().await;

    engine
        .add_deduction(AddDeductionCmd::new(2025, 6).amount(pesos(15)))
        .await
        .unwrap();

    let err = engine
        .add_deduction(AddDeductionCmd::new(2025, 6).amount(pesos(15)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Duplicate(_)));

    engine
        .add_deduction(AddDeductionCmd::new(2025, 6).amount(pesos(15)).force())
        .await
        .unwrap();
    let deductions = engine.list_deductions(2025).await.unwrap();
    assert_eq!(deductions.len(), 2);
}

#[tokio::test]
async fn undone_deductions_free_the_month_and_the_capital() {
    let engine = engine_with_db().await;
    engine.set_interest_base(2025, pesos(1_000)).await.unwrap();

    let id = engine
        .add_deduction(AddDeductionCmd::new(2025, 6).amount(pesos(15)))
        .await
        .unwrap();
    assert_eq!(engine.available_capital(2025).await.unwrap(), pesos(985));

    engine.undo_deduction(id).await.unwrap();
    assert_eq!(engine.available_capital(2025).await.unwrap(), pesos(1_000));
    // The month can be used again without force.
    engine
        .add_deduction(AddDeductionCmd::new(2025, 6).amount(pesos(15)))
        .await
        .unwrap();

    assert!(matches!(
        engine.undo_deduction(9_999).await.unwrap_err(),
        LedgerError::NotFound(_)
    ));
}
