use crate::{
    DepositCmd, EngineError, Notification, NotificationCategory, ResultEngine, Transaction,
    TransactionKind, TransferCmd, WithdrawCmd,
    transactions::NewTransaction,
    util::{normalize_optional_text, require_positive},
};

use super::{Engine, with_uow};

fn transaction_notification(owner_id: &str, title: &str, message: String) -> Notification {
    Notification::new(owner_id, title, message, NotificationCategory::Transaction)
}

impl Engine {
    /// Credits an owned, active account.
    pub async fn deposit(&self, cmd: DepositCmd) -> ResultEngine<Transaction> {
        require_positive(cmd.amount, "amount")?;
        let DepositCmd {
            actor,
            account_id,
            amount,
            meta,
        } = cmd;

        with_uow!(self, |uow| {
            let account = self.find_owned_active(&uow, account_id, &actor).await?;
            let updated = self.apply_balance_delta(&uow, account.id, amount).await?;
            let tx = self
                .record(
                    &uow,
                    NewTransaction::new(
                        &account.owner_id,
                        TransactionKind::Deposit,
                        amount,
                        account.currency,
                    )
                    .to_account(account.id)
                    .description(normalize_optional_text(meta.description.as_deref()))
                    .category(normalize_optional_text(meta.category.as_deref()))
                    .reference(normalize_optional_text(meta.reference.as_deref())),
                )
                .await?;

            tracing::info!(
                transaction_id = %tx.transaction_id,
                account_id = %account.id,
                amount = amount.minor(),
                "deposit committed"
            );
            uow.notify(transaction_notification(
                &account.owner_id,
                "Deposit received",
                format!(
                    "{} was deposited into {}. New balance: {}.",
                    amount.format(account.currency),
                    account.label(),
                    updated.balance.format(updated.currency)
                ),
            ));
            Ok(tx)
        })
    }

    /// Debits an owned, active account.
    ///
    /// Fails with `InsufficientFunds` when the amount exceeds what the
    /// account can cover; the balance is then unchanged.
    pub async fn withdraw(&self, cmd: WithdrawCmd) -> ResultEngine<Transaction> {
        require_positive(cmd.amount, "amount")?;
        let WithdrawCmd {
            actor,
            account_id,
            amount,
            meta,
        } = cmd;

        with_uow!(self, |uow| {
            let account = self.find_owned_active(&uow, account_id, &actor).await?;
            if !account.can_cover(amount) {
                return Err(EngineError::InsufficientFunds(format!(
                    "account {} has {} available, {} requested",
                    account.account_number,
                    account.spendable().format(account.currency),
                    amount.format(account.currency)
                )));
            }
            let updated = self.apply_guarded_debit(&uow, &account, amount).await?;
            let tx = self
                .record(
                    &uow,
                    NewTransaction::new(
                        &account.owner_id,
                        TransactionKind::Withdrawal,
                        amount,
                        account.currency,
                    )
                    .from_account(account.id)
                    .description(normalize_optional_text(meta.description.as_deref()))
                    .category(normalize_optional_text(meta.category.as_deref()))
                    .reference(normalize_optional_text(meta.reference.as_deref())),
                )
                .await?;

            tracing::info!(
                transaction_id = %tx.transaction_id,
                account_id = %account.id,
                amount = amount.minor(),
                "withdrawal committed"
            );
            uow.notify(transaction_notification(
                &account.owner_id,
                "Withdrawal made",
                format!(
                    "{} was withdrawn from {}. New balance: {}.",
                    amount.format(account.currency),
                    account.label(),
                    updated.balance.format(updated.currency)
                ),
            ));
            Ok(tx)
        })
    }

    /// Moves money from an owned account to any active account.
    ///
    /// The debit, the credit and the `transfer` record commit together. The
    /// sender is always notified; the receiver only when it is a different
    /// owner.
    pub async fn transfer(&self, cmd: TransferCmd) -> ResultEngine<Transaction> {
        require_positive(cmd.amount, "amount")?;
        if cmd.from_account_id == cmd.to_account_id {
            return Err(EngineError::InvalidState(
                "from_account_id and to_account_id must differ".to_string(),
            ));
        }
        let TransferCmd {
            actor,
            from_account_id,
            to_account_id,
            amount,
            meta,
        } = cmd;

        with_uow!(self, |uow| {
            let source = self
                .find_owned_active(&uow, from_account_id, &actor)
                .await?;
            let destination = self.find_active_by_id(&uow, to_account_id).await?;
            if source.currency != destination.currency {
                return Err(EngineError::InvalidState(format!(
                    "currency mismatch: {} to {}",
                    source.currency.code(),
                    destination.currency.code()
                )));
            }
            if !source.can_cover(amount) {
                return Err(EngineError::InsufficientFunds(format!(
                    "account {} has {} available, {} requested",
                    source.account_number,
                    source.spendable().format(source.currency),
                    amount.format(source.currency)
                )));
            }

            let debited = self.apply_guarded_debit(&uow, &source, amount).await?;
            self.apply_balance_delta(&uow, destination.id, amount)
                .await?;
            let tx = self
                .record(
                    &uow,
                    NewTransaction::new(
                        &source.owner_id,
                        TransactionKind::Transfer,
                        amount,
                        source.currency,
                    )
                    .from_account(source.id)
                    .to_account(destination.id)
                    .description(normalize_optional_text(meta.description.as_deref()))
                    .category(normalize_optional_text(meta.category.as_deref()))
                    .reference(normalize_optional_text(meta.reference.as_deref())),
                )
                .await?;

            tracing::info!(
                transaction_id = %tx.transaction_id,
                from_account_id = %source.id,
                to_account_id = %destination.id,
                amount = amount.minor(),
                "transfer committed"
            );
            let formatted = amount.format(source.currency);
            uow.notify(transaction_notification(
                &source.owner_id,
                "Transfer sent",
                format!(
                    "{formatted} was sent from {} to account {}. New balance: {}.",
                    source.label(),
                    destination.account_number,
                    debited.balance.format(debited.currency)
                ),
            ));
            if destination.owner_id != source.owner_id {
                uow.notify(transaction_notification(
                    &destination.owner_id,
                    "Transfer received",
                    format!(
                        "{formatted} was received into {}.",
                        destination.label()
                    ),
                ));
            }
            Ok(tx)
        })
    }
}
