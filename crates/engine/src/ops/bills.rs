use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, prelude::*};

use crate::{
    Actor, BillPayment, BillPaymentUpdate, BillStatus, EngineError, Notification,
    NotificationCategory, ResultEngine, ScheduleBillCmd, Transaction, TransactionKind,
    UnitOfWork, bill_payments,
    transactions::NewTransaction,
    util::{normalize_optional_text, normalize_required_text, require_positive},
};

use super::{Engine, with_uow};

const DEFAULT_BILL_CATEGORY: &str = "Bills";

/// Filters for listing an owner's bill payments.
#[derive(Clone, Debug, Default)]
pub struct BillPaymentFilter {
    pub status: Option<BillStatus>,
    pub account_id: Option<Uuid>,
}

impl BillPaymentFilter {
    #[must_use]
    pub fn status(mut self, status: BillStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn account(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }
}

fn bill_notification(owner_id: &str, title: &str, message: String) -> Notification {
    Notification::new(owner_id, title, message, NotificationCategory::BillPayment)
}

/// Loads a bill payment and checks that `actor` may see it.
async fn load_bill<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    bill_id: Uuid,
) -> ResultEngine<BillPayment> {
    let model = bill_payments::Entity::find_by_id(bill_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("bill payment {bill_id}")))?;
    if !actor.can_access(&model.owner_id) {
        return Err(EngineError::Unauthorized(format!("bill payment {bill_id}")));
    }
    BillPayment::try_from(model)
}

/// Writes `bill` back only while the stored row is still `scheduled`.
///
/// The status check and the write are one conditional `UPDATE`, so two
/// callers racing on the same bill can not both move it out of `scheduled`.
async fn save_if_scheduled(uow: &UnitOfWork, bill: &BillPayment) -> ResultEngine<()> {
    let result = bill_payments::Entity::update_many()
        .set(bill_payments::ActiveModel::from(bill))
        .filter(bill_payments::Column::Id.eq(bill.id.to_string()))
        .filter(bill_payments::Column::Status.eq(BillStatus::Scheduled.as_str()))
        .exec(uow.db())
        .await?;
    if result.rows_affected == 0 {
        tracing::warn!(bill_id = %bill.id, "bill payment changed concurrently");
        return Err(EngineError::InvalidState(
            "bill payment is no longer scheduled".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Schedules a payment funded by an owned, active account.
    pub async fn schedule_bill_payment(&self, cmd: ScheduleBillCmd) -> ResultEngine<BillPayment> {
        require_positive(cmd.amount, "amount")?;
        let payee = normalize_required_text(&cmd.payee, "payee")?;

        with_uow!(self, |uow| {
            let account = self
                .find_owned_active(&uow, cmd.account_id, &cmd.actor)
                .await?;
            let mut bill = BillPayment::new(
                account.owner_id.clone(),
                account.id,
                payee,
                cmd.amount,
                cmd.due_date,
                cmd.frequency,
                Utc::now(),
            );
            bill.description = normalize_optional_text(cmd.description.as_deref());
            bill.category = normalize_optional_text(cmd.category.as_deref());
            if let Some(enabled) = cmd.reminder_enabled {
                bill.reminder_enabled = enabled;
            }
            if let Some(days) = cmd.reminder_days {
                bill.reminder_days = days;
            }
            bill_payments::ActiveModel::from(&bill)
                .insert(uow.db())
                .await?;

            tracing::info!(
                bill_id = %bill.id,
                account_id = %account.id,
                due_date = %bill.due_date,
                frequency = bill.frequency.as_str(),
                "bill payment scheduled"
            );
            uow.notify(bill_notification(
                &bill.owner_id,
                "Bill payment scheduled",
                format!(
                    "{} to {} is scheduled for {}.",
                    bill.amount.format(account.currency),
                    bill.payee,
                    bill.due_date
                ),
            ));
            Ok(bill)
        })
    }

    /// Applies a partial update to a `scheduled` bill payment.
    pub async fn update_bill_payment(
        &self,
        actor: &Actor,
        bill_id: Uuid,
        update: BillPaymentUpdate,
    ) -> ResultEngine<BillPayment> {
        if let Some(amount) = update.amount {
            require_positive(amount, "amount")?;
        }
        let payee = update
            .payee
            .as_deref()
            .map(|p| normalize_required_text(p, "payee"))
            .transpose()?;

        with_uow!(self, |uow| {
            let mut bill = load_bill(uow.db(), actor, bill_id).await?;
            bill.ensure_scheduled()?;
            if update.is_empty() {
                return Ok(bill);
            }

            if let Some(account_id) = update.account_id
                && account_id != bill.account_id
            {
                let account = self.find_owned_active(&uow, account_id, actor).await?;
                if account.owner_id != bill.owner_id {
                    return Err(EngineError::InvalidState(
                        "funding account must belong to the bill owner".to_string(),
                    ));
                }
                bill.account_id = account.id;
            }
            if let Some(payee) = payee {
                bill.payee = payee;
            }
            if let Some(amount) = update.amount {
                bill.amount = amount;
            }
            if let Some(due_date) = update.due_date {
                bill.due_date = due_date;
            }
            if let Some(frequency) = update.frequency {
                bill.frequency = frequency;
            }
            if let Some(description) = update.description.as_deref() {
                bill.description = normalize_optional_text(Some(description));
            }
            if let Some(category) = update.category.as_deref() {
                bill.category = normalize_optional_text(Some(category));
            }
            if let Some(enabled) = update.reminder_enabled {
                bill.reminder_enabled = enabled;
            }
            if let Some(days) = update.reminder_days {
                bill.reminder_days = days;
            }
            bill.updated_at = Utc::now();

            save_if_scheduled(&uow, &bill).await?;
            tracing::debug!(bill_id = %bill.id, "bill payment updated");
            Ok(bill)
        })
    }

    /// Pays a `scheduled` bill immediately.
    ///
    /// The debit, the `completed` status, the `payment` transaction and, for
    /// recurring bills, the next `scheduled` instance are one unit of work.
    /// On `InsufficientFunds` the bill stays `scheduled`.
    pub async fn pay_bill_now(
        &self,
        actor: &Actor,
        bill_id: Uuid,
    ) -> ResultEngine<(BillPayment, Transaction)> {
        with_uow!(self, |uow| {
            let mut bill = load_bill(uow.db(), actor, bill_id).await?;
            bill.ensure_scheduled()?;
            let account = self.find_active_by_id(&uow, bill.account_id).await?;
            if !account.can_cover(bill.amount) {
                return Err(EngineError::InsufficientFunds(format!(
                    "account {} has {} available, bill is {}",
                    account.account_number,
                    account.spendable().format(account.currency),
                    bill.amount.format(account.currency)
                )));
            }

            // Claim the bill before moving money.
            let now = Utc::now();
            bill.status = BillStatus::Completed;
            bill.payment_date = Some(now);
            bill.updated_at = now;
            save_if_scheduled(&uow, &bill).await?;
            let debited = self
                .apply_guarded_debit(&uow, &account, bill.amount)
                .await?;

            let description = bill
                .description
                .clone()
                .unwrap_or_else(|| format!("Bill payment to {}", bill.payee));
            let category = bill
                .category
                .clone()
                .unwrap_or_else(|| DEFAULT_BILL_CATEGORY.to_string());
            let tx = self
                .record(
                    &uow,
                    NewTransaction::new(
                        &bill.owner_id,
                        TransactionKind::Payment,
                        bill.amount,
                        account.currency,
                    )
                    .from_account(account.id)
                    .description(Some(description))
                    .category(Some(category))
                    .payee(Some(bill.payee.clone())),
                )
                .await?;

            let next = bill.successor(now)?;
            if let Some(next) = next.as_ref() {
                bill_payments::ActiveModel::from(next)
                    .insert(uow.db())
                    .await?;
            }

            tracing::info!(
                bill_id = %bill.id,
                transaction_id = %tx.transaction_id,
                amount = bill.amount.minor(),
                next_due = ?next.as_ref().map(|n| n.due_date),
                "bill payment completed"
            );
            let mut message = format!(
                "{} was paid to {} from {}. New balance: {}.",
                bill.amount.format(account.currency),
                bill.payee,
                account.label(),
                debited.balance.format(debited.currency)
            );
            if let Some(next) = next.as_ref() {
                message.push_str(&format!(" Next payment is due {}.", next.due_date));
            }
            uow.notify(bill_notification(&bill.owner_id, "Bill paid", message));
            Ok((bill, tx))
        })
    }

    /// Cancels a `scheduled` bill payment.
    pub async fn cancel_bill_payment(
        &self,
        actor: &Actor,
        bill_id: Uuid,
    ) -> ResultEngine<BillPayment> {
        with_uow!(self, |uow| {
            let mut bill = load_bill(uow.db(), actor, bill_id).await?;
            bill.ensure_scheduled()?;
            bill.status = BillStatus::Cancelled;
            bill.updated_at = Utc::now();
            save_if_scheduled(&uow, &bill).await?;

            tracing::info!(bill_id = %bill.id, "bill payment cancelled");
            uow.notify(bill_notification(
                &bill.owner_id,
                "Bill payment cancelled",
                format!(
                    "The payment to {} due {} was cancelled.",
                    bill.payee, bill.due_date
                ),
            ));
            Ok(bill)
        })
    }

    pub async fn bill_payment(&self, actor: &Actor, bill_id: Uuid) -> ResultEngine<BillPayment> {
        load_bill(&self.database, actor, bill_id).await
    }

    /// Lists an owner's bill payments by due date.
    pub async fn bill_payments_for_owner(
        &self,
        owner_id: &str,
        filter: &BillPaymentFilter,
    ) -> ResultEngine<Vec<BillPayment>> {
        let mut query = bill_payments::Entity::find()
            .filter(bill_payments::Column::OwnerId.eq(owner_id.to_string()));
        if let Some(status) = filter.status {
            query = query.filter(bill_payments::Column::Status.eq(status.as_str()));
        }
        if let Some(account_id) = filter.account_id {
            query = query.filter(bill_payments::Column::AccountId.eq(account_id.to_string()));
        }
        query
            .order_by_asc(bill_payments::Column::DueDate)
            .order_by_asc(bill_payments::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(BillPayment::try_from)
            .collect()
    }

    /// `scheduled` bills due on or before `on_or_before`, soonest first.
    pub async fn upcoming_bill_payments(
        &self,
        owner_id: &str,
        on_or_before: NaiveDate,
    ) -> ResultEngine<Vec<BillPayment>> {
        bill_payments::Entity::find()
            .filter(bill_payments::Column::OwnerId.eq(owner_id.to_string()))
            .filter(bill_payments::Column::Status.eq(BillStatus::Scheduled.as_str()))
            .filter(bill_payments::Column::DueDate.lte(on_or_before))
            .order_by_asc(bill_payments::Column::DueDate)
            .order_by_asc(bill_payments::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(BillPayment::try_from)
            .collect()
    }
}
