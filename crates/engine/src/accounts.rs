//! The module contains `Account` struct and its storage model.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, Money, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Checking,
    Savings,
    Credit,
    Investment,
    Loan,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Savings => "savings",
            Self::Credit => "credit",
            Self::Investment => "investment",
            Self::Loan => "loan",
        }
    }

    pub fn is_credit(self) -> bool {
        matches!(self, Self::Credit)
    }
}

impl TryFrom<&str> for AccountType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "checking" => Ok(Self::Checking),
            "savings" => Ok(Self::Savings),
            "credit" => Ok(Self::Credit),
            "investment" => Ok(Self::Investment),
            "loan" => Ok(Self::Loan),
            other => Err(EngineError::InvalidState(format!(
                "invalid account type: {other}"
            ))),
        }
    }
}

/// Terms attached to `credit` accounts only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTerms {
    pub credit_limit: Money,
    pub minimum_payment: Money,
    pub due_date: Option<NaiveDate>,
}

/// A bank account.
///
/// Balances only change through the transfer and bill payment operations of
/// the engine; an account is never deleted, closing it clears `is_active`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    /// Human-facing 10-digit number, unique across the store.
    pub account_number: String,
    pub owner_id: String,
    pub nickname: Option<String>,
    pub account_type: AccountType,
    pub balance: Money,
    pub currency: Currency,
    pub is_active: bool,
    /// Present iff `account_type` is `credit`.
    pub credit: Option<CreditTerms>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Lowest balance a debit may leave behind.
    ///
    /// Zero for every account type except `credit`, which may be drawn down
    /// to its credit limit.
    #[must_use]
    pub fn balance_floor(&self) -> Money {
        match self.credit {
            Some(terms) if self.account_type.is_credit() => -terms.credit_limit,
            _ => Money::ZERO,
        }
    }

    /// Amount that can be debited right now, saturating at `Money::MAX`.
    #[must_use]
    pub fn spendable(&self) -> Money {
        self.balance
            .checked_sub(self.balance_floor())
            .unwrap_or(Money::MAX)
    }

    #[must_use]
    pub fn can_cover(&self, amount: Money) -> bool {
        self.balance
            .checked_sub(amount)
            .is_some_and(|rest| rest >= self.balance_floor())
    }

    /// Remaining credit line, `None` for non-credit accounts.
    #[must_use]
    pub fn available_credit(&self) -> Option<Money> {
        let terms = self.credit?;
        let used = if self.balance.is_negative() {
            -self.balance
        } else {
            Money::ZERO
        };
        let available = terms.credit_limit - used;
        Some(if available.is_negative() {
            Money::ZERO
        } else {
            available
        })
    }

    #[must_use]
    pub fn label(&self) -> String {
        let tail = &self.account_number[self.account_number.len().saturating_sub(4)..];
        match self.nickname.as_deref() {
            Some(nickname) => format!("{nickname} (…{tail})"),
            None => format!("{} …{tail}", self.account_type.as_str()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub account_number: String,
    pub owner_id: String,
    pub nickname: Option<String>,
    pub account_type: String,
    pub balance: i64,
    pub currency: String,
    pub is_active: bool,
    pub credit_limit: Option<i64>,
    pub minimum_payment: Option<i64>,
    pub credit_due_date: Option<Date>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bill_payments::Entity")]
    BillPayments,
}

impl Related<super::bill_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillPayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            account_number: ActiveValue::Set(value.account_number.clone()),
            owner_id: ActiveValue::Set(value.owner_id.clone()),
            nickname: ActiveValue::Set(value.nickname.clone()),
            account_type: ActiveValue::Set(value.account_type.as_str().to_string()),
            balance: ActiveValue::Set(value.balance.minor()),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            is_active: ActiveValue::Set(value.is_active),
            credit_limit: ActiveValue::Set(value.credit.map(|c| c.credit_limit.minor())),
            minimum_payment: ActiveValue::Set(value.credit.map(|c| c.minimum_payment.minor())),
            credit_due_date: ActiveValue::Set(value.credit.and_then(|c| c.due_date)),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let account_type = AccountType::try_from(model.account_type.as_str())?;
        let credit = account_type.is_credit().then(|| CreditTerms {
            credit_limit: Money::new(model.credit_limit.unwrap_or_default()),
            minimum_payment: Money::new(model.minimum_payment.unwrap_or_default()),
            due_date: model.credit_due_date,
        });
        Ok(Self {
            id: parse_uuid(&model.id, "account")?,
            account_number: model.account_number,
            owner_id: model.owner_id,
            nickname: model.nickname,
            account_type,
            balance: Money::new(model.balance),
            currency: Currency::try_from(model.currency.as_str())?,
            is_active: model.is_active,
            credit,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(account_type: AccountType, balance: i64, credit: Option<CreditTerms>) -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4(),
            account_number: "1234567890".to_string(),
            owner_id: "alice".to_string(),
            nickname: None,
            account_type,
            balance: Money::new(balance),
            currency: Currency::Usd,
            is_active: true,
            credit,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn non_credit_accounts_cannot_go_below_zero() {
        let checking = account(AccountType::Checking, 1000, None);
        assert_eq!(checking.balance_floor(), Money::ZERO);
        assert!(checking.can_cover(Money::new(1000)));
        assert!(!checking.can_cover(Money::new(1001)));
        assert_eq!(checking.available_credit(), None);
    }

    #[test]
    fn credit_accounts_draw_down_to_the_limit() {
        let terms = CreditTerms {
            credit_limit: Money::new(50_000),
            minimum_payment: Money::new(2_500),
            due_date: None,
        };
        let card = account(AccountType::Credit, -20_000, Some(terms));
        assert_eq!(card.balance_floor(), Money::new(-50_000));
        assert_eq!(card.spendable(), Money::new(30_000));
        assert_eq!(card.available_credit(), Some(Money::new(30_000)));
        assert!(card.can_cover(Money::new(30_000)));
        assert!(!card.can_cover(Money::new(30_001)));
    }

    #[test]
    fn coverage_checks_do_not_overflow_near_the_limits() {
        let terms = CreditTerms {
            credit_limit: Money::new(100),
            minimum_payment: Money::ZERO,
            due_date: None,
        };
        let card = account(AccountType::Credit, i64::MAX - 10, Some(terms));
        assert_eq!(card.spendable(), Money::MAX);
        assert!(card.can_cover(Money::new(5)));
        assert!(card.can_cover(Money::MAX));

        let overdrawn = account(AccountType::Credit, -100, Some(terms));
        assert!(!overdrawn.can_cover(Money::MAX));
    }

    #[test]
    fn label_uses_last_four_digits() {
        let mut checking = account(AccountType::Checking, 0, None);
        assert_eq!(checking.label(), "checking …7890");
        checking.nickname = Some("Rent".to_string());
        assert_eq!(checking.label(), "Rent (…7890)");
    }

    #[test]
    fn account_type_round_trips_through_str() {
        for kind in [
            AccountType::Checking,
            AccountType::Savings,
            AccountType::Credit,
            AccountType::Investment,
            AccountType::Loan,
        ] {
            assert_eq!(AccountType::try_from(kind.as_str()).unwrap(), kind);
        }
        assert!(AccountType::try_from("brokerage").is_err());
    }
}
