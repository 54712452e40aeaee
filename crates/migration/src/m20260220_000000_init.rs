//! Initial schema migration - creates all tables from scratch.
//!
//! Complete schema for the cooperative fund ledger:
//!
//! - `members`: member directory (managed by the surrounding app)
//! - `loans`: released principal with borrower, rate, year attribution
//! - `advance_payments`: out-of-schedule principal repayments
//! - `interest_payments`: monthly interest schedule, unique per
//!   (loan, month, year)
//! - `contributions`: monthly member fees, unique per (member, month, year)
//! - `cash_flows`: one denormalized summary row per ledger year
//! - `capital_transactions`: append-only capital audit log with source tags
//! - `capital_deductions`: manual per-month fees

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Members {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    Active,
}

#[derive(Iden)]
enum Loans {
    Table,
    Id,
    MemberId,
    NonMemberName,
    AmountMinor,
    BalanceMinor,
    InterestRateBps,
    Status,
    Year,
    Description,
    Notes,
}

#[derive(Iden)]
enum AdvancePayments {
    Table,
    Id,
    LoanId,
    AmountMinor,
    PaymentDate,
    Notes,
}

#[derive(Iden)]
enum InterestPayments {
    Table,
    Id,
    LoanId,
    Month,
    Year,
    AmountMinor,
    Status,
    PaymentDate,
    Notes,
}

#[derive(Iden)]
enum Contributions {
    Table,
    Id,
    MemberId,
    AmountMinor,
    Month,
    Year,
    Status,
    PaymentDate,
    Notes,
}

#[derive(Iden)]
enum CashFlows {
    Table,
    Year,
    CapitalMinor,
    InterestCollectedMinor,
    InterestCollectedBaseMinor,
    MonthlyContributionsCollectedMinor,
    MoneyReleasedMinor,
}

#[derive(Iden)]
enum CapitalTransactions {
    Table,
    Id,
    Year,
    LoanId,
    Kind,
    AmountMinor,
    Description,
    SourceKind,
    SourceId,
}

#[derive(Iden)]
enum CapitalDeductions {
    Table,
    Id,
    Year,
    Month,
    AmountMinor,
    Description,
    RecordedBy,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Members
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Members::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Members::FirstName).string().not_null())
                    .col(ColumnDef::new(Members::LastName).string().not_null())
                    .col(ColumnDef::new(Members::Email).string())
                    .col(
                        ColumnDef::new(Members::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Loans
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Loans::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Loans::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Loans::MemberId).string())
                    .col(ColumnDef::new(Loans::NonMemberName).string())
                    .col(ColumnDef::new(Loans::AmountMinor).big_integer().not_null())
                    .col(
                        ColumnDef::new(Loans::BalanceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Loans::InterestRateBps)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Loans::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Loans::Year).integer())
                    .col(ColumnDef::new(Loans::Description).string())
                    .col(ColumnDef::new(Loans::Notes).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-loans-member_id")
                            .from(Loans::Table, Loans::MemberId)
                            .to(Members::Table, Members::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-loans-year")
                    .table(Loans::Table)
                    .col(Loans::Year)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-loans-member_id")
                    .table(Loans::Table)
                    .col(Loans::MemberId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Advance payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(AdvancePayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdvancePayments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AdvancePayments::LoanId).string().not_null())
                    .col(
                        ColumnDef::new(AdvancePayments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AdvancePayments::PaymentDate)
                            .date()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AdvancePayments::Notes).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-advance_payments-loan_id")
                            .from(AdvancePayments::Table, AdvancePayments::LoanId)
                            .to(Loans::Table, Loans::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-advance_payments-loan_id")
                    .table(AdvancePayments::Table)
                    .col(AdvancePayments::LoanId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Interest payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(InterestPayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InterestPayments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InterestPayments::LoanId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InterestPayments::Month).integer().not_null())
                    .col(ColumnDef::new(InterestPayments::Year).integer().not_null())
                    .col(
                        ColumnDef::new(InterestPayments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InterestPayments::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(InterestPayments::PaymentDate).date())
                    .col(ColumnDef::new(InterestPayments::Notes).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-interest_payments-loan_id")
                            .from(InterestPayments::Table, InterestPayments::LoanId)
                            .to(Loans::Table, Loans::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-interest_payments-loan-month-year-unique")
                    .table(InterestPayments::Table)
                    .col(InterestPayments::LoanId)
                    .col(InterestPayments::Month)
                    .col(InterestPayments::Year)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Contributions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Contributions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contributions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Contributions::MemberId).string().not_null())
                    .col(
                        ColumnDef::new(Contributions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Contributions::Month).integer().not_null())
                    .col(ColumnDef::new(Contributions::Year).integer().not_null())
                    .col(
                        ColumnDef::new(Contributions::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Contributions::PaymentDate).date())
                    .col(ColumnDef::new(Contributions::Notes).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-contributions-member_id")
                            .from(Contributions::Table, Contributions::MemberId)
                            .to(Members::Table, Members::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-contributions-member-month-year-unique")
                    .table(Contributions::Table)
                    .col(Contributions::MemberId)
                    .col(Contributions::Month)
                    .col(Contributions::Year)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Cash flows (per-year summary)
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(CashFlows::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CashFlows::Year)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CashFlows::CapitalMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CashFlows::InterestCollectedMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CashFlows::InterestCollectedBaseMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CashFlows::MonthlyContributionsCollectedMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CashFlows::MoneyReleasedMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Capital transactions (audit log)
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(CapitalTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CapitalTransactions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CapitalTransactions::Year)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CapitalTransactions::LoanId).string())
                    .col(ColumnDef::new(CapitalTransactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(CapitalTransactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CapitalTransactions::Description)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CapitalTransactions::SourceKind).string())
                    .col(ColumnDef::new(CapitalTransactions::SourceId).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-capital_transactions-loan_id")
                            .from(CapitalTransactions::Table, CapitalTransactions::LoanId)
                            .to(Loans::Table, Loans::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-capital_transactions-year")
                    .table(CapitalTransactions::Table)
                    .col(CapitalTransactions::Year)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-capital_transactions-source")
                    .table(CapitalTransactions::Table)
                    .col(CapitalTransactions::SourceKind)
                    .col(CapitalTransactions::SourceId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Capital deductions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(CapitalDeductions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CapitalDeductions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CapitalDeductions::Year)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CapitalDeductions::Month)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CapitalDeductions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CapitalDeductions::Description).string())
                    .col(ColumnDef::new(CapitalDeductions::RecordedBy).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-capital_deductions-year-month")
                    .table(CapitalDeductions::Table)
                    .col(CapitalDeductions::Year)
                    .col(CapitalDeductions::Month)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(CapitalDeductions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CapitalTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CashFlows::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Contributions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InterestPayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdvancePayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Loans::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await?;
        Ok(())
    }
}
