//! Bookkeeping core for a cooperative lending fund.
//!
//! The engine owns the ledger rows (loans, interest schedules, contributions,
//! advance payments, manual deductions, the capital audit log) and the
//! per-year cash-flow summary derived from them. Mutations run inside one
//! database transaction each and finish by recomputing the affected cached
//! totals from the source rows; the recompute functions are idempotent, so
//! cached values can always be repaired by running them again.
//!
//! The surrounding application (HTTP, auth, mail, member CRUD) lives
//! elsewhere and calls in through [`Engine`].

pub use advance_payments::AdvancePayment;
pub use capital_deductions::{DEFAULT_MONTHLY_FEE, Deduction};
pub use capital_transactions::{CapitalEntryKind, CapitalSourceKind, CapitalTransaction};
pub use cash_flows::CashFlow;
pub use commands::{AddDeductionCmd, CreateLoanCmd, RecordAdvancePaymentCmd};
pub use contributions::{Contribution, DEFAULT_MONTHLY_CONTRIBUTION};
pub use error::LedgerError;
pub use interest_payments::{InterestPayment, PaymentStatus, amount_due};
pub use loans::{Borrower, Loan, LoanStatus, MEMBER_RATE_BPS, NON_MEMBER_RATE_BPS};
pub use money::Money;
pub use ops::{
    BulkContributionReceipt, Engine, EngineBuilder, InterestVerification, MonthTotal, YearReport,
    YearReassignment,
};

mod advance_payments;
mod capital_deductions;
mod capital_transactions;
mod cash_flows;
mod commands;
mod contributions;
mod error;
mod interest_payments;
mod loans;
mod members;
mod money;
mod ops;

type ResultLedger<T> = Result<T, LedgerError>;
