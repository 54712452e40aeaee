use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, Statement};
use uuid::Uuid;

use engine::{
    Borrower, CapitalEntryKind, CapitalSourceKind, CreateLoanCmd, Engine, LedgerError, LoanStatus,
    Money, PaymentStatus, RecordAdvancePaymentCmd,
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

/// Make a year's available capital non-zero by seeding the manual interest
/// baseline.
async fn fund_year(engine: &Engine, year: i32, amount: Money) {
    engine.set_interest_base(year, amount).await.unwrap();
}

#[tokio::test]
async fn loan_rejected_when_amount_exceeds_available_capital() {
    let engine = engine_with_db().await;
    fund_year(&engine, 2025, pesos(5_000)).await;

    let err = engine
        .create_loan(CreateLoanCmd::new(alice(), pesos(10_000), 2025))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        LedgerError::InsufficientCapital {
            available: pesos(5_000),
            requested: pesos(10_000),
        }
    );
    // Nothing was applied.
    assert_eq!(engine.summary(2025).await.unwrap().money_released, Money::ZERO);
    assert!(engine.list_capital_transactions(2025).await.unwrap().is_empty());
}

#[tokio::test]
async fn loan_creation_updates_money_released_and_logs_disbursement() {
    let engine = engine_with_db().await;
    fund_year(&engine, 2025, pesos(15_000)).await;

    let loan_id = engine
        .create_loan(
            CreateLoanCmd::new(alice(), pesos(10_000), 2025).interest_rate_bps(300),
        )
        .await
        .unwrap();

    let summary = engine.summary(2025).await.unwrap();
    assert_eq!(summary.money_released, pesos(10_000));

    let transactions = engine.list_capital_transactions(2025).await.unwrap();
    assert_eq!(transactions.len(), 1);
    let disbursement = &transactions[0];
    assert_eq!(disbursement.kind, CapitalEntryKind::Deduction);
    assert_eq!(disbursement.amount, pesos(10_000));
    assert_eq!(
        disbursement.source_kind,
        Some(CapitalSourceKind::LoanDisbursement)
    );
    assert_eq!(disbursement.source_id.as_deref(), Some(loan_id.to_string().as_str()));
    assert!(disbursement.description.contains("Alice Reyes"));

    // The released principal is now committed: only 5,000 is left to lend.
    assert_eq!(engine.available_capital(2025).await.unwrap(), pesos(5_000));
}

#[tokio::test]
async fn deleting_a_loan_reverts_the_year() {
    let engine = engine_with_db().await;
    fund_year(&engine, 2025, pesos(15_000)).await;

    let loan_id = engine
        .create_loan(CreateLoanCmd::new(alice(), pesos(10_000), 2025))
        .await
        .unwrap();
    engine.delete_loan(loan_id).await.unwrap();

    assert_eq!(engine.summary(2025).await.unwrap().money_released, Money::ZERO);
    assert!(engine.list_capital_transactions(2025).await.unwrap().is_empty());
    assert_eq!(engine.available_capital(2025).await.unwrap(), pesos(15_000));
    assert!(matches!(
        engine.loan(loan_id).await.unwrap_err(),
        LedgerError::NotFound(_)
    ));
}

#[tokio::test]
async fn balance_stays_within_bounds_under_record_and_revert() {
    let engine = engine_with_db().await;
    fund_year(&engine, 2025, pesos(20_000)).await;

    let loan_id = engine
        .create_loan(CreateLoanCmd::new(alice(), pesos(10_000), 2025))
        .await
        .unwrap();

    let first = engine
        .record_advance_payment(RecordAdvancePaymentCmd::new(
            loan_id,
            pesos(4_000),
            date(2025, 3, 10),
        ))
        .await
        .unwrap();
    assert_eq!(engine.loan(loan_id).await.unwrap().balance, pesos(6_000));

    // Over-paying clamps at zero instead of going negative.
    engine
        .record_advance_payment(RecordAdvancePaymentCmd::new(
            loan_id,
            pesos(8_000),
            date(2025, 4, 10),
        ))
        .await
        .unwrap();
    let loan = engine.loan(loan_id).await.unwrap();
    assert_eq!(loan.balance, Money::ZERO);
    assert!(loan.balance >= Money::ZERO && loan.balance <= loan.amount);

    // Reverting restores, ceilinged at the principal.
    engine
        .revert_advance_payment(loan_id, first, date(2025, 5, 1))
        .await
        .unwrap();
    let loan = engine.loan(loan_id).await.unwrap();
    assert!(loan.balance >= Money::ZERO && loan.balance <= loan.amount);
}

#[tokio::test]
async fn record_then_revert_round_trips_the_balance() {
    let engine = engine_with_db().await;
    fund_year(&engine, 2025, pesos(20_000)).await;

    let loan_id = engine
        .create_loan(CreateLoanCmd::new(alice(), pesos(10_000), 2025))
        .await
        .unwrap();

    let payment_id = engine
        .record_advance_payment(RecordAdvancePaymentCmd::new(
            loan_id,
            pesos(2_000),
            date(2025, 3, 10),
        ))
        .await
        .unwrap();
    assert_eq!(engine.remaining_balance(loan_id).await.unwrap(), pesos(8_000));

    engine
        .revert_advance_payment(loan_id, payment_id, date(2025, 3, 20))
        .await
        .unwrap();
    assert_eq!(engine.loan(loan_id).await.unwrap().balance, pesos(10_000));
    assert_eq!(engine.remaining_balance(loan_id).await.unwrap(), pesos(10_000));
}

#[tokio::test]
async fn revert_rejects_payment_of_another_loan() {
    let engine = engine_with_db().await;
    fund_year(&engine, 2025, pesos(30_000)).await;

    let first = engine
        .create_loan(CreateLoanCmd::new(alice(), pesos(5_000), 2025))
        .await
        .unwrap();
    let second = engine
        .create_loan(CreateLoanCmd::new(alice(), pesos(5_000), 2025))
        .await
        .unwrap();
    let payment = engine
        .record_advance_payment(RecordAdvancePaymentCmd::new(
            first,
            pesos(1_000),
            date(2025, 6, 1),
        ))
        .await
        .unwrap();

    let err = engine
        .revert_advance_payment(second, payment, date(2025, 6, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
    // The payment is still there.
    assert_eq!(engine.remaining_balance(first).await.unwrap(), pesos(4_000));
}

#[tokio::test]
async fn advance_payment_reprices_pending_months_only() {
    let engine = engine_with_db().await;
    fund_year(&engine, 2025, pesos(15_000)).await;

    let loan_id = engine
        .create_loan(
            CreateLoanCmd::new(alice(), pesos(10_000), 2025).interest_rate_bps(300),
        )
        .await
        .unwrap();
    engine.set_loan_status(loan_id, LoanStatus::Approved).await.unwrap();

    let schedule = engine.ensure_interest_schedule(loan_id, 2025).await.unwrap();
    assert_eq!(schedule.len(), 12);
    assert_eq!(schedule[0].amount, Money::ZERO); // January
    assert!(schedule[1..].iter().all(|row| row.amount == pesos(300)));

    // February is already collected before the advance payment lands.
    engine
        .set_interest_status(loan_id, 2, 2025, PaymentStatus::Paid, date(2025, 2, 28))
        .await
        .unwrap();

    engine
        .record_advance_payment(RecordAdvancePaymentCmd::new(
            loan_id,
            pesos(2_000),
            date(2025, 3, 10),
        ))
        .await
        .unwrap();

    let schedule = engine.interest_schedule(loan_id, 2025).await.unwrap();
    // January stays zero, paid February keeps its historical amount, and
    // March through December accrue on the reduced balance: 8,000 × 3% = 240.
    assert_eq!(schedule[0].amount, Money::ZERO);
    assert_eq!(schedule[1].amount, pesos(300));
    assert_eq!(schedule[1].status, PaymentStatus::Paid);
    for row in &schedule[2..] {
        assert_eq!(row.amount, pesos(240));
        assert_eq!(row.status, PaymentStatus::Pending);
    }
}

#[tokio::test]
async fn loan_status_steps_are_validated() {
    let engine = engine_with_db().await;
    fund_year(&engine, 2025, pesos(15_000)).await;

    let loan_id = engine
        .create_loan(CreateLoanCmd::new(alice(), pesos(1_000), 2025))
        .await
        .unwrap();

    // pending → paid skips approval.
    assert!(matches!(
        engine.set_loan_status(loan_id, LoanStatus::Paid).await.unwrap_err(),
        LedgerError::Validation(_)
    ));
    engine.set_loan_status(loan_id, LoanStatus::Approved).await.unwrap();
    engine.set_loan_status(loan_id, LoanStatus::Paid).await.unwrap();
    assert_eq!(engine.loan(loan_id).await.unwrap().status, LoanStatus::Paid);

    // Status changes moved no money.
    assert_eq!(engine.summary(2025).await.unwrap().money_released, pesos(1_000));
}

#[tokio::test]
async fn non_member_loans_carry_co_maker_and_five_percent_default() {
    let engine = engine_with_db().await;
    fund_year(&engine, 2025, pesos(15_000)).await;

    let loan_id = engine
        .create_loan(CreateLoanCmd::new(
            Borrower::NonMember {
                name: "Ramon Cruz".to_string(),
                co_maker_id: Uuid::parse_str(ALICE).unwrap(),
            },
            pesos(10_000),
            2025,
        ))
        .await
        .unwrap();

    let loan = engine.loan(loan_id).await.unwrap();
    assert_eq!(loan.interest_rate_bps, 500);
    assert_eq!(loan.borrower.non_member_name(), Some("Ramon Cruz"));

    let transactions = engine.list_capital_transactions(2025).await.unwrap();
    assert!(transactions[0].description.contains("Ramon Cruz"));
}
