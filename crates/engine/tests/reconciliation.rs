use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, Statement};
use uuid::Uuid;

use engine::{
    AddDeductionCmd, Borrower, CreateLoanCmd, Engine, LedgerError, LoanStatus, Money,
    PaymentStatus,
};
use migration::MigratorTrait;

const ALICE: &str = "11111111-1111-4111-8111-111111111111";

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO members (id, first_name, last_name, email, active) VALUES (?, ?, ?, ?, ?)",
        vec![
            ALICE.into(),
            "Alice".into(),
            "Reyes".into(),
            "alice@example.com".into(),
            true.into(),
        ],
    ))
    .await
    .unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

fn alice() -> Borrower {
    Borrower::Member {
        member_id: Uuid::parse_str(ALICE).unwrap(),
    }
}

fn pesos(amount: i64) -> Money {
    Money::new(amount * 100)
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A funded year with one approved ₱10,000 loan at 3% and its schedule.
async fn approved_loan(engine: &Engine, year: i32) -> Uuid {
    engine.set_interest_base(year, pesos(15_000)).await.unwrap();
    let loan_id = engine
        .create_loan(CreateLoanCmd::new(alice(), pesos(10_000), year).interest_rate_bps(300))
        .await
        .unwrap();
    engine.set_loan_status(loan_id, LoanStatus::Approved).await.unwrap();
    engine.ensure_interest_schedule(loan_id, year).await.unwrap();
    loan_id
}

#[tokio::test]
async fn recompute_is_idempotent() {
    let engine = engine_with_db().await;
    let loan_id = approved_loan(&engine, 2025).await;
    engine
        .set_interest_status(loan_id, 2, 2025, PaymentStatus::Paid, date(2025, 2, 28))
        .await
        .unwrap();

    let first = engine.recalc_interest_collected(2025).await.unwrap();
    let second = engine.recalc_interest_collected(2025).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, pesos(15_300));

    let first = engine.recalc_contributions_collected(2025).await.unwrap();
    let second = engine.recalc_contributions_collected(2025).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn paying_january_adds_nothing() {
    let engine = engine_with_db().await;
    let loan_id = approved_loan(&engine, 2025).await;
    let before = engine.summary(2025).await.unwrap().interest_collected;

    engine
        .set_interest_status(loan_id, 1, 2025, PaymentStatus::Paid, date(2025, 1, 31))
        .await
        .unwrap();

    let after = engine.summary(2025).await.unwrap().interest_collected;
    assert_eq!(before, after);
}

#[tokio::test]
async fn interest_toggle_round_trips_collected_total() {
    let engine = engine_with_db().await;
    let loan_id = approved_loan(&engine, 2025).await;
    let before = engine.summary(2025).await.unwrap().interest_collected;

    engine
        .set_interest_status(loan_id, 2, 2025, PaymentStatus::Paid, date(2025, 2, 28))
        .await
        .unwrap();
    assert_eq!(
        engine.summary(2025).await.unwrap().interest_collected,
        before + pesos(300)
    );
    assert_eq!(engine.list_capital_transactions(2025).await.unwrap().len(), 2);

    engine
        .set_interest_status(loan_id, 2, 2025, PaymentStatus::Pending, date(2025, 2, 28))
        .await
        .unwrap();
    assert_eq!(engine.summary(2025).await.unwrap().interest_collected, before);
    // Only the disbursement entry is left; the interest entry was removed by
    // its source tag.
    let transactions = engine.list_capital_transactions(2025).await.unwrap();
    assert_eq!(transactions.len(), 1);
}

#[tokio::test]
async fn interest_is_blocked_while_the_loan_is_pending() {
    let engine = engine_with_db().await;
    engine.set_interest_base(2025, pesos(15_000)).await.unwrap();
    let loan_id = engine
        .create_loan(CreateLoanCmd::new(alice(), pesos(10_000), 2025))
        .await
        .unwrap();
    engine.ensure_interest_schedule(loan_id, 2025).await.unwrap();

    let err = engine
        .set_interest_status(loan_id, 2, 2025, PaymentStatus::Paid, date(2025, 2, 28))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    assert_eq!(
        engine.summary(2025).await.unwrap().interest_collected,
        pesos(15_000)
    );
}

#[tokio::test]
async fn year_reassignment_conserves_value_across_years() {
    let engine = engine_with_db().await;
    let loan_id = approved_loan(&engine, 2025).await;
    engine
        .set_interest_status(loan_id, 2, 2025, PaymentStatus::Paid, date(2025, 2, 28))
        .await
        .unwrap();

    let interest_before = engine.summary(2025).await.unwrap().interest_collected
        + engine.summary(2026).await.unwrap().interest_collected;
    let released_before = engine.summary(2025).await.unwrap().money_released
        + engine.summary(2026).await.unwrap().money_released;

    let report = engine.reassign_loan_year(loan_id, 2026).await.unwrap();
    assert_eq!(report.moved, 12);
    assert_eq!(report.merged, 0);
    assert_eq!(report.discarded_paid, Money::ZERO);

    let summary_old = engine.summary(2025).await.unwrap();
    let summary_new = engine.summary(2026).await.unwrap();

    // Attribution moved, nothing created or destroyed. The manual baseline
    // stays with 2025; the paid payment follows the loan.
    assert_eq!(
        summary_old.interest_collected + summary_new.interest_collected,
        interest_before
    );
    assert_eq!(
        summary_old.money_released + summary_new.money_released,
        released_before
    );
    assert_eq!(summary_old.interest_collected, pesos(15_000));
    assert_eq!(summary_new.interest_collected, pesos(300));
    assert_eq!(summary_new.money_released, pesos(10_000));

    // The audit rows moved with the loan.
    let moved = engine.list_capital_transactions(2026).await.unwrap();
    assert_eq!(moved.len(), 2);
    assert!(engine.list_capital_transactions(2025).await.unwrap().is_empty());
}

#[tokio::test]
async fn year_reassignment_merges_duplicates_and_accounts_the_discard() {
    let engine = engine_with_db().await;
    let loan_id = approved_loan(&engine, 2025).await;
    // A schedule already exists at the target year too.
    engine.ensure_interest_schedule(loan_id, 2026).await.unwrap();

    // Both sides of February are paid; the moved copy must be discarded and
    // reported.
    engine
        .set_interest_status(loan_id, 2, 2025, PaymentStatus::Paid, date(2025, 2, 28))
        .await
        .unwrap();
    engine
        .set_interest_status(loan_id, 2, 2026, PaymentStatus::Paid, date(2026, 2, 28))
        .await
        .unwrap();
    // March is only paid on the moving side; the target row must adopt it.
    engine
        .set_interest_status(loan_id, 3, 2025, PaymentStatus::Paid, date(2025, 3, 31))
        .await
        .unwrap();

    let report = engine.reassign_loan_year(loan_id, 2026).await.unwrap();
    assert_eq!(report.moved, 0);
    assert_eq!(report.merged, 12);
    assert_eq!(report.discarded_paid, pesos(300));

    let schedule = engine.interest_schedule(loan_id, 2026).await.unwrap();
    assert_eq!(schedule.len(), 12);
    assert_eq!(schedule[1].status, PaymentStatus::Paid); // February (target copy)
    assert_eq!(schedule[2].status, PaymentStatus::Paid); // March (adopted)
    assert!(engine.interest_schedule(loan_id, 2025).await.unwrap().is_empty());

    // 2026 now collects the two surviving paid rows.
    assert_eq!(
        engine.summary(2026).await.unwrap().interest_collected,
        pesos(600)
    );
    assert_eq!(engine.summary(2025).await.unwrap().interest_collected, pesos(15_000));
}

#[tokio::test]
async fn available_capital_never_goes_negative() {
    let engine = engine_with_db().await;
    engine.set_interest_base(2025, pesos(100)).await.unwrap();
    engine
        .add_deduction(
            AddDeductionCmd::new(2025, 6)
                .amount(pesos(500))
                .description("annual audit fee"),
        )
        .await
        .unwrap();

    assert_eq!(engine.available_capital(2025).await.unwrap(), Money::ZERO);
}

#[tokio::test]
async fn available_capital_subtracts_balances_and_deductions() {
    let engine = engine_with_db().await;
    engine.set_interest_base(2025, pesos(15_000)).await.unwrap();
    let loan_id = engine
        .create_loan(CreateLoanCmd::new(alice(), pesos(10_000), 2025))
        .await
        .unwrap();
    engine
        .record_advance_payment(engine::RecordAdvancePaymentCmd::new(
            loan_id,
            pesos(4_000),
            date(2025, 5, 2),
        ))
        .await
        .unwrap();
    engine
        .add_deduction(AddDeductionCmd::new(2025, 5).amount(pesos(15)))
        .await
        .unwrap();

    // 15,000 collected − 6,000 outstanding − 15 deducted.
    assert_eq!(engine.available_capital(2025).await.unwrap(), pesos(8_985));

    let report = engine.year_report(2025).await.unwrap();
    assert_eq!(report.available_capital, pesos(8_985));
    assert_eq!(report.total_loan_balances, pesos(6_000));
    assert_eq!(report.total_deductions, pesos(15));
    assert_eq!(report.base_capital, pesos(15_000));
}

#[tokio::test]
async fn verification_flags_a_hand_patched_cache() {
    let engine = engine_with_db().await;
    let loan_id = approved_loan(&engine, 2025).await;
    engine
        .set_interest_status(loan_id, 2, 2025, PaymentStatus::Paid, date(2025, 2, 28))
        .await
        .unwrap();

    let verification = engine.verify_interest_collected(2025).await.unwrap();
    assert!(verification.is_consistent());
    assert_eq!(verification.actual, pesos(300));
    assert_eq!(verification.paid_payments, 1);
    assert_eq!(verification.by_month.len(), 1);
    assert_eq!(verification.by_month[0].month, 2);

    // Recompute repairs any drift and stays stable.
    let repaired = engine.recalc_interest_collected(2025).await.unwrap();
    assert_eq!(repaired, pesos(15_300));
}
