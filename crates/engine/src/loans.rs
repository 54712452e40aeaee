//! Loan primitives.
//!
//! A `Loan` releases principal to a borrower and anchors every downstream
//! record: the monthly interest schedule, advance payments, and the
//! disbursement entry in the capital audit log. Its `year` decides which
//! yearly summary absorbs all of that activity.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, Money, ResultLedger};

/// Default monthly rate for member borrowers, in basis points (3%).
pub const MEMBER_RATE_BPS: i64 = 300;
/// Default monthly rate for non-member borrowers, in basis points (5%).
pub const NON_MEMBER_RATE_BPS: i64 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
}

impl LoanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Paid => "paid",
        }
    }

    /// Allowed lifecycle steps: `pending → approved → paid` or
    /// `pending → rejected`. Status changes move no money.
    #[must_use]
    pub fn can_transition(self, to: LoanStatus) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Approved, Self::Paid)
        )
    }
}

impl TryFrom<&str> for LoanStatus {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "paid" => Ok(Self::Paid),
            other => Err(LedgerError::Validation(format!(
                "invalid loan status: {other}"
            ))),
        }
    }
}

/// Who the money went to.
///
/// Non-member borrowers must name a member as co-maker (guarantor), so both
/// the free-text name and a member reference are stored for them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Borrower {
    Member {
        member_id: Uuid,
    },
    NonMember {
        name: String,
        co_maker_id: Uuid,
    },
}

impl Borrower {
    /// The member reference: the borrower for member loans, the co-maker for
    /// non-member loans.
    #[must_use]
    pub fn member_id(&self) -> Uuid {
        match self {
            Self::Member { member_id } => *member_id,
            Self::NonMember { co_maker_id, .. } => *co_maker_id,
        }
    }

    #[must_use]
    pub fn non_member_name(&self) -> Option<&str> {
        match self {
            Self::Member { .. } => None,
            Self::NonMember { name, .. } => Some(name.as_str()),
        }
    }

    #[must_use]
    pub fn default_rate_bps(&self) -> i64 {
        match self {
            Self::Member { .. } => MEMBER_RATE_BPS,
            Self::NonMember { .. } => NON_MEMBER_RATE_BPS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: Uuid,
    pub borrower: Borrower,
    pub amount: Money,
    /// Running remaining balance: `amount` minus advance payments, never
    /// negative, never above `amount`.
    pub balance: Money,
    pub interest_rate_bps: i64,
    pub status: LoanStatus,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

impl Loan {
    pub fn new(
        borrower: Borrower,
        amount: Money,
        interest_rate_bps: Option<i64>,
        year: Option<i32>,
    ) -> ResultLedger<Self> {
        if !amount.is_positive() {
            return Err(LedgerError::Validation(
                "loan amount must be > 0".to_string(),
            ));
        }
        if let Borrower::NonMember { name, .. } = &borrower
            && name.trim().is_empty()
        {
            return Err(LedgerError::Validation(
                "non-member borrower name must not be empty".to_string(),
            ));
        }
        let rate = interest_rate_bps.unwrap_or_else(|| borrower.default_rate_bps());
        if rate < 0 {
            return Err(LedgerError::Validation(
                "interest rate must be >= 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            borrower,
            amount,
            balance: amount,
            interest_rate_bps: rate,
            status: LoanStatus::Pending,
            year,
            description: None,
            notes: None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub member_id: Option<String>,
    pub non_member_name: Option<String>,
    pub amount_minor: i64,
    pub balance_minor: i64,
    pub interest_rate_bps: i64,
    pub status: String,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::members::Entity",
        from = "Column::MemberId",
        to = "super::members::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Members,
    #[sea_orm(has_many = "super::interest_payments::Entity")]
    InterestPayments,
    #[sea_orm(has_many = "super::advance_payments::Entity")]
    AdvancePayments,
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::interest_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InterestPayments.def()
    }
}

impl Related<super::advance_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AdvancePayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Loan> for ActiveModel {
    fn from(loan: &Loan) -> Self {
        Self {
            id: ActiveValue::Set(loan.id.to_string()),
            member_id: ActiveValue::Set(Some(loan.borrower.member_id().to_string())),
            non_member_name: ActiveValue::Set(
                loan.borrower.non_member_name().map(ToString::to_string),
            ),
            amount_minor: ActiveValue::Set(loan.amount.minor()),
            balance_minor: ActiveValue::Set(loan.balance.minor()),
            interest_rate_bps: ActiveValue::Set(loan.interest_rate_bps),
            status: ActiveValue::Set(loan.status.as_str().to_string()),
            year: ActiveValue::Set(loan.year),
            description: ActiveValue::Set(loan.description.clone()),
            notes: ActiveValue::Set(loan.notes.clone()),
        }
    }
}

impl TryFrom<Model> for Loan {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&model.id)
            .map_err(|_| LedgerError::NotFound("loan not exists".to_string()))?;
        let member_id = model
            .member_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|_| LedgerError::Validation("invalid member id on loan".to_string()))?;
        let borrower = match (model.non_member_name, member_id) {
            (Some(name), Some(co_maker_id)) => Borrower::NonMember { name, co_maker_id },
            (None, Some(member_id)) => Borrower::Member { member_id },
            (Some(_), None) => {
                return Err(LedgerError::Validation(
                    "non-member loan is missing its co-maker".to_string(),
                ));
            }
            (None, None) => {
                return Err(LedgerError::Validation(
                    "loan has neither member nor non-member borrower".to_string(),
                ));
            }
        };
        Ok(Self {
            id,
            borrower,
            amount: Money::new(model.amount_minor),
            balance: Money::new(model.balance_minor),
            interest_rate_bps: model.interest_rate_bps,
            status: LoanStatus::try_from(model.status.as_str())?,
            year: model.year,
            description: model.description,
            notes: model.notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_loans_default_to_three_percent() {
        let loan = Loan::new(
            Borrower::Member {
                member_id: Uuid::new_v4(),
            },
            Money::new(1_000_00),
            None,
            Some(2025),
        )
        .unwrap();
        assert_eq!(loan.interest_rate_bps, MEMBER_RATE_BPS);
        assert_eq!(loan.balance, loan.amount);
        assert_eq!(loan.status, LoanStatus::Pending);
    }

    #[test]
    fn non_member_loans_default_to_five_percent_and_keep_co_maker() {
        let co_maker = Uuid::new_v4();
        let loan = Loan::new(
            Borrower::NonMember {
                name: "Ramon Cruz".to_string(),
                co_maker_id: co_maker,
            },
            Money::new(1_000_00),
            None,
            Some(2025),
        )
        .unwrap();
        assert_eq!(loan.interest_rate_bps, NON_MEMBER_RATE_BPS);
        assert_eq!(loan.borrower.member_id(), co_maker);
        assert_eq!(loan.borrower.non_member_name(), Some("Ramon Cruz"));
    }

    #[test]
    fn rejects_non_positive_amount_and_blank_names() {
        let member = Borrower::Member {
            member_id: Uuid::new_v4(),
        };
        assert!(Loan::new(member.clone(), Money::ZERO, None, Some(2025)).is_err());
        assert!(Loan::new(member, Money::new(-1), None, Some(2025)).is_err());
        assert!(
            Loan::new(
                Borrower::NonMember {
                    name: "  ".to_string(),
                    co_maker_id: Uuid::new_v4(),
                },
                Money::new(100),
                None,
                Some(2025),
            )
            .is_err()
        );
    }

    #[test]
    fn status_machine_allows_only_documented_steps() {
        use LoanStatus::*;
        assert!(Pending.can_transition(Approved));
        assert!(Pending.can_transition(Rejected));
        assert!(Approved.can_transition(Paid));
        assert!(!Approved.can_transition(Rejected));
        assert!(!Rejected.can_transition(Approved));
        assert!(!Paid.can_transition(Pending));
    }
}
