//! Transaction records.
//!
//! A `Transaction` is the immutable trace of one executed ledger mutation. It
//! is written in the same unit of work as the balance change it describes and
//! never updated afterwards; a reversal is a new record.
//!
//! `amount` is always positive. Direction is carried by `kind` and by which of
//! `from_account` / `to_account` is populated.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, Money, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
    Payment,
    Fee,
    Interest,
    Refund,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Transfer => "transfer",
            Self::Payment => "payment",
            Self::Fee => "fee",
            Self::Interest => "interest",
            Self::Refund => "refund",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            "transfer" => Ok(Self::Transfer),
            "payment" => Ok(Self::Payment),
            "fee" => Ok(Self::Fee),
            "interest" => Ok(Self::Interest),
            "refund" => Ok(Self::Refund),
            other => Err(EngineError::InvalidState(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidState(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    /// Human-facing id, `TX` followed by 10 digits.
    pub transaction_id: String,
    pub owner_id: String,
    pub from_account: Option<Uuid>,
    pub to_account: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount: Money,
    pub currency: Currency,
    pub status: TransactionStatus,
    pub description: Option<String>,
    pub category: Option<String>,
    pub payee: Option<String>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by an engine operation when recording a transaction.
///
/// Identifiers, status and timestamp are filled in by the recorder.
#[derive(Clone, Debug)]
pub(crate) struct NewTransaction {
    pub owner_id: String,
    pub kind: TransactionKind,
    pub from_account: Option<Uuid>,
    pub to_account: Option<Uuid>,
    pub amount: Money,
    pub currency: Currency,
    pub description: Option<String>,
    pub category: Option<String>,
    pub payee: Option<String>,
    pub reference: Option<String>,
}

impl NewTransaction {
    pub fn new(owner_id: &str, kind: TransactionKind, amount: Money, currency: Currency) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            kind,
            from_account: None,
            to_account: None,
            amount,
            currency,
            description: None,
            category: None,
            payee: None,
            reference: None,
        }
    }

    pub fn from_account(mut self, account_id: Uuid) -> Self {
        self.from_account = Some(account_id);
        self
    }

    pub fn to_account(mut self, account_id: Uuid) -> Self {
        self.to_account = Some(account_id);
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    pub fn payee(mut self, payee: Option<String>) -> Self {
        self.payee = payee;
        self
    }

    pub fn reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub transaction_id: String,
    pub owner_id: String,
    pub from_account: Option<String>,
    pub to_account: Option<String>,
    pub kind: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub payee: Option<String>,
    pub reference: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            transaction_id: ActiveValue::Set(tx.transaction_id.clone()),
            owner_id: ActiveValue::Set(tx.owner_id.clone()),
            from_account: ActiveValue::Set(tx.from_account.map(|id| id.to_string())),
            to_account: ActiveValue::Set(tx.to_account.map(|id| id.to_string())),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount.minor()),
            currency: ActiveValue::Set(tx.currency.code().to_string()),
            status: ActiveValue::Set(tx.status.as_str().to_string()),
            description: ActiveValue::Set(tx.description.clone()),
            category: ActiveValue::Set(tx.category.clone()),
            payee: ActiveValue::Set(tx.payee.clone()),
            reference: ActiveValue::Set(tx.reference.clone()),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            transaction_id: model.transaction_id,
            owner_id: model.owner_id,
            from_account: model
                .from_account
                .as_deref()
                .map(|id| parse_uuid(id, "account"))
                .transpose()?,
            to_account: model
                .to_account
                .as_deref()
                .map(|id| parse_uuid(id, "account"))
                .transpose()?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount: Money::new(model.amount_minor),
            currency: Currency::try_from(model.currency.as_str())?,
            status: TransactionStatus::try_from(model.status.as_str())?,
            description: model.description,
            category: model.category,
            payee: model.payee,
            reference: model.reference,
            created_at: model.created_at,
        })
    }
}
