//! Scheduled bill payments and their recurrence rules.
//!
//! A `BillPayment` is an obligation funded by one account. It starts
//! `scheduled` and leaves that state exactly once; every other state is
//! history and is never edited again.

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, util::parse_uuid};

pub const DEFAULT_REMINDER_DAYS: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Scheduled,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl BillStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for BillStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "scheduled" => Ok(Self::Scheduled),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidState(format!(
                "invalid bill payment status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    OneTime,
    Weekly,
    BiWeekly,
    Monthly,
    Quarterly,
    Annually,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneTime => "one-time",
            Self::Weekly => "weekly",
            Self::BiWeekly => "bi-weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annually => "annually",
        }
    }

    pub fn is_recurring(self) -> bool {
        !matches!(self, Self::OneTime)
    }

    /// Due date of the next instance, `None` for one-time payments.
    ///
    /// Calendar steps clamp to the last day of the target month, so
    /// Jan 31 + 1 month is the last day of February and Feb 29 + 1 year is
    /// Feb 28.
    pub fn advance(self, due_date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::OneTime => None,
            Self::Weekly => due_date.checked_add_days(Days::new(7)),
            Self::BiWeekly => due_date.checked_add_days(Days::new(14)),
            Self::Monthly => due_date.checked_add_months(Months::new(1)),
            Self::Quarterly => due_date.checked_add_months(Months::new(3)),
            Self::Annually => due_date.checked_add_months(Months::new(12)),
        }
    }
}

impl TryFrom<&str> for Frequency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "one-time" => Ok(Self::OneTime),
            "weekly" => Ok(Self::Weekly),
            "bi-weekly" => Ok(Self::BiWeekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "annually" => Ok(Self::Annually),
            other => Err(EngineError::InvalidState(format!(
                "invalid frequency: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillPayment {
    pub id: Uuid,
    pub owner_id: String,
    /// Funding account.
    pub account_id: Uuid,
    pub payee: String,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub status: BillStatus,
    pub frequency: Frequency,
    pub description: Option<String>,
    pub category: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub reminder_enabled: bool,
    pub reminder_days: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BillPayment {
    pub(crate) fn new(
        owner_id: String,
        account_id: Uuid,
        payee: String,
        amount: Money,
        due_date: NaiveDate,
        frequency: Frequency,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            account_id,
            payee,
            amount,
            due_date,
            status: BillStatus::Scheduled,
            frequency,
            description: None,
            category: None,
            payment_date: None,
            reminder_enabled: true,
            reminder_days: DEFAULT_REMINDER_DAYS,
            created_at: now,
            updated_at: now,
        }
    }

    /// Edits, cancellation and pay-now are only accepted while `scheduled`.
    pub fn ensure_scheduled(&self) -> ResultEngine<()> {
        if self.status != BillStatus::Scheduled {
            return Err(EngineError::InvalidState(format!(
                "bill payment is {}",
                self.status.as_str()
            )));
        }
        Ok(())
    }

    /// The next `scheduled` instance of a recurring payment.
    ///
    /// The successor is a fresh record: it carries payee, amount,
    /// description, category and reminder settings forward, with the due
    /// date advanced by the frequency.
    pub fn successor(&self, now: DateTime<Utc>) -> ResultEngine<Option<BillPayment>> {
        if !self.frequency.is_recurring() {
            return Ok(None);
        }
        let due_date = self.frequency.advance(self.due_date).ok_or_else(|| {
            EngineError::InvalidState("next due date out of range".to_string())
        })?;
        let mut next = BillPayment::new(
            self.owner_id.clone(),
            self.account_id,
            self.payee.clone(),
            self.amount,
            due_date,
            self.frequency,
            now,
        );
        next.description = self.description.clone();
        next.category = self.category.clone();
        next.reminder_enabled = self.reminder_enabled;
        next.reminder_days = self.reminder_days;
        Ok(Some(next))
    }

    /// Day on which a reminder is due, if reminders are enabled.
    pub fn reminder_date(&self) -> Option<NaiveDate> {
        if !self.reminder_enabled {
            return None;
        }
        self.due_date
            .checked_sub_days(Days::new(u64::from(self.reminder_days)))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bill_payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub account_id: String,
    pub payee: String,
    pub amount_minor: i64,
    pub due_date: Date,
    pub status: String,
    pub frequency: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub payment_date: Option<DateTimeUtc>,
    pub reminder_enabled: bool,
    pub reminder_days: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&BillPayment> for ActiveModel {
    fn from(bill: &BillPayment) -> Self {
        Self {
            id: ActiveValue::Set(bill.id.to_string()),
            owner_id: ActiveValue::Set(bill.owner_id.clone()),
            account_id: ActiveValue::Set(bill.account_id.to_string()),
            payee: ActiveValue::Set(bill.payee.clone()),
            amount_minor: ActiveValue::Set(bill.amount.minor()),
            due_date: ActiveValue::Set(bill.due_date),
            status: ActiveValue::Set(bill.status.as_str().to_string()),
            frequency: ActiveValue::Set(bill.frequency.as_str().to_string()),
            description: ActiveValue::Set(bill.description.clone()),
            category: ActiveValue::Set(bill.category.clone()),
            payment_date: ActiveValue::Set(bill.payment_date),
            reminder_enabled: ActiveValue::Set(bill.reminder_enabled),
            reminder_days: ActiveValue::Set(i32::try_from(bill.reminder_days).unwrap_or(i32::MAX)),
            created_at: ActiveValue::Set(bill.created_at),
            updated_at: ActiveValue::Set(bill.updated_at),
        }
    }
}

impl TryFrom<Model> for BillPayment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "bill payment")?,
            owner_id: model.owner_id,
            account_id: parse_uuid(&model.account_id, "account")?,
            payee: model.payee,
            amount: Money::new(model.amount_minor),
            due_date: model.due_date,
            status: BillStatus::try_from(model.status.as_str())?,
            frequency: Frequency::try_from(model.frequency.as_str())?,
            description: model.description,
            category: model.category,
            payment_date: model.payment_date,
            reminder_enabled: model.reminder_enabled,
            reminder_days: u32::try_from(model.reminder_days).unwrap_or_default(),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
