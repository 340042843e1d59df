//! Command structs for engine operations.
//!
//! These types group parameters for write operations
//! (open/deposit/withdraw/transfer/schedule/update), keeping call sites
//! readable and avoiding long argument lists.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{AccountType, CreditTerms, Currency, Frequency, Money};

/// The authenticated caller of an operation.
///
/// Identity is established outside the engine. `elevated` is the admin
/// capability asserted by the caller: it lifts ownership checks but never
/// active-state checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub owner_id: String,
    pub elevated: bool,
}

impl Actor {
    #[must_use]
    pub fn owner(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            elevated: false,
        }
    }

    #[must_use]
    pub fn admin(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            elevated: true,
        }
    }

    pub fn can_access(&self, owner_id: &str) -> bool {
        self.elevated || self.owner_id == owner_id
    }
}

/// Optional free text attached to a transaction.
#[derive(Clone, Debug, Default)]
pub struct TxMeta {
    pub description: Option<String>,
    pub category: Option<String>,
    pub reference: Option<String>,
}

/// Open a new account.
#[derive(Clone, Debug)]
pub struct OpenAccountCmd {
    pub owner_id: String,
    pub account_type: AccountType,
    pub currency: Currency,
    pub initial_deposit: Money,
    pub nickname: Option<String>,
    pub credit: Option<CreditTerms>,
}

impl OpenAccountCmd {
    #[must_use]
    pub fn new(owner_id: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            owner_id: owner_id.into(),
            account_type,
            currency: Currency::default(),
            initial_deposit: Money::ZERO,
            nickname: None,
            credit: None,
        }
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    #[must_use]
    pub fn initial_deposit(mut self, amount: Money) -> Self {
        self.initial_deposit = amount;
        self
    }

    #[must_use]
    pub fn nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    #[must_use]
    pub fn credit(mut self, terms: CreditTerms) -> Self {
        self.credit = Some(terms);
        self
    }
}

/// Deposit money into an owned account.
#[derive(Clone, Debug)]
pub struct DepositCmd {
    pub actor: Actor,
    pub account_id: Uuid,
    pub amount: Money,
    pub meta: TxMeta,
}

impl DepositCmd {
    #[must_use]
    pub fn new(actor: Actor, account_id: Uuid, amount: Money) -> Self {
        Self {
            actor,
            account_id,
            amount,
            meta: TxMeta::default(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.meta.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.meta.reference = Some(reference.into());
        self
    }
}

/// Withdraw money from an owned account.
#[derive(Clone, Debug)]
pub struct WithdrawCmd {
    pub actor: Actor,
    pub account_id: Uuid,
    pub amount: Money,
    pub meta: TxMeta,
}

impl WithdrawCmd {
    #[must_use]
    pub fn new(actor: Actor, account_id: Uuid, amount: Money) -> Self {
        Self {
            actor,
            account_id,
            amount,
            meta: TxMeta::default(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.meta.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.meta.reference = Some(reference.into());
        self
    }
}

/// Move money from an owned account to any active account.
#[derive(Clone, Debug)]
pub struct TransferCmd {
    pub actor: Actor,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Money,
    pub meta: TxMeta,
}

impl TransferCmd {
    #[must_use]
    pub fn new(actor: Actor, from_account_id: Uuid, to_account_id: Uuid, amount: Money) -> Self {
        Self {
            actor,
            from_account_id,
            to_account_id,
            amount,
            meta: TxMeta::default(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.meta.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.meta.reference = Some(reference.into());
        self
    }
}

/// Schedule a bill payment against an owned account.
#[derive(Clone, Debug)]
pub struct ScheduleBillCmd {
    pub actor: Actor,
    pub account_id: Uuid,
    pub payee: String,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub frequency: Frequency,
    pub description: Option<String>,
    pub category: Option<String>,
    pub reminder_enabled: Option<bool>,
    pub reminder_days: Option<u32>,
}

impl ScheduleBillCmd {
    #[must_use]
    pub fn new(
        actor: Actor,
        account_id: Uuid,
        payee: impl Into<String>,
        amount: Money,
        due_date: NaiveDate,
        frequency: Frequency,
    ) -> Self {
        Self {
            actor,
            account_id,
            payee: payee.into(),
            amount,
            due_date,
            frequency,
            description: None,
            category: None,
            reminder_enabled: None,
            reminder_days: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn reminder(mut self, enabled: bool, days: u32) -> Self {
        self.reminder_enabled = Some(enabled);
        self.reminder_days = Some(days);
        self
    }
}

/// Partial update of a scheduled bill payment; `None` leaves a field as is.
#[derive(Clone, Debug, Default)]
pub struct BillPaymentUpdate {
    pub account_id: Option<Uuid>,
    pub payee: Option<String>,
    pub amount: Option<Money>,
    pub due_date: Option<NaiveDate>,
    pub frequency: Option<Frequency>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub reminder_enabled: Option<bool>,
    pub reminder_days: Option<u32>,
}

impl BillPaymentUpdate {
    pub fn is_empty(&self) -> bool {
        self.account_id.is_none()
            && self.payee.is_none()
            && self.amount.is_none()
            && self.due_date.is_none()
            && self.frequency.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.reminder_enabled.is_none()
            && self.reminder_days.is_none()
    }
}
