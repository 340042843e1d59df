use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, prelude::*, sea_query::Expr,
};

use crate::{
    Account, Actor, EngineError, Money, Notification, NotificationCategory, OpenAccountCmd,
    ResultEngine, TransactionKind, UnitOfWork, accounts, transactions::NewTransaction,
    util::{amount_too_large, normalize_optional_text, require_positive},
};

use super::{Engine, with_uow};

fn account_not_found(account_id: Uuid) -> EngineError {
    EngineError::NotFound(format!("account {account_id}"))
}

/// Loads an account regardless of owner and active state.
pub(super) async fn load_account<C: ConnectionTrait>(
    db: &C,
    account_id: Uuid,
) -> ResultEngine<Account> {
    let model = accounts::Entity::find_by_id(account_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| account_not_found(account_id))?;
    Account::try_from(model)
}

impl Engine {
    /// Returns the account if it is active and owned by `actor`.
    ///
    /// Elevated actors skip the ownership filter. A failed filter is reported
    /// as `NotFound`.
    pub async fn find_owned_active(
        &self,
        uow: &UnitOfWork,
        account_id: Uuid,
        actor: &Actor,
    ) -> ResultEngine<Account> {
        let mut query = accounts::Entity::find_by_id(account_id.to_string())
            .filter(accounts::Column::IsActive.eq(true));
        if !actor.elevated {
            query = query.filter(accounts::Column::OwnerId.eq(actor.owner_id.clone()));
        }
        let model = query
            .one(uow.db())
            .await?
            .ok_or_else(|| account_not_found(account_id))?;
        Account::try_from(model)
    }

    /// Returns the account if it is active, whoever owns it.
    pub async fn find_active_by_id(
        &self,
        uow: &UnitOfWork,
        account_id: Uuid,
    ) -> ResultEngine<Account> {
        let model = accounts::Entity::find_by_id(account_id.to_string())
            .filter(accounts::Column::IsActive.eq(true))
            .one(uow.db())
            .await?
            .ok_or_else(|| account_not_found(account_id))?;
        Account::try_from(model)
    }

    /// Adds `delta` to the balance of an active account.
    ///
    /// No sufficiency check happens here: callers debit through
    /// [`Engine::apply_guarded_debit`] instead. A result outside the `i64`
    /// range is rejected with `InvalidState` before anything is written.
    pub async fn apply_balance_delta(
        &self,
        uow: &UnitOfWork,
        account_id: Uuid,
        delta: Money,
    ) -> ResultEngine<Account> {
        let current = load_account(uow.db(), account_id).await?;
        if !current.is_active {
            return Err(account_not_found(account_id));
        }
        current
            .balance
            .checked_add(delta)
            .ok_or_else(amount_too_large)?;

        // Same bound at write time, in case the balance moved since the read.
        let in_range = if delta.is_negative() {
            accounts::Column::Balance.gte(i64::MIN - delta.minor())
        } else {
            accounts::Column::Balance.lte(i64::MAX - delta.minor())
        };
        let result = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::Balance,
                Expr::col(accounts::Column::Balance).add(delta.minor()),
            )
            .col_expr(accounts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(accounts::Column::Id.eq(account_id.to_string()))
            .filter(accounts::Column::IsActive.eq(true))
            .filter(in_range)
            .exec(uow.db())
            .await?;
        if result.rows_affected == 0 {
            return Err(amount_too_large());
        }
        load_account(uow.db(), account_id).await
    }

    /// Debits `amount` only if the balance stored at write time still covers
    /// it down to the account floor.
    ///
    /// The check and the write are a single conditional `UPDATE`, so a
    /// concurrent debit that committed after `account` was read can not push
    /// the balance past the floor.
    pub async fn apply_guarded_debit(
        &self,
        uow: &UnitOfWork,
        account: &Account,
        amount: Money,
    ) -> ResultEngine<Account> {
        require_positive(amount, "amount")?;
        let min_balance = account
            .balance_floor()
            .checked_add(amount)
            .ok_or_else(amount_too_large)?;
        let result = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::Balance,
                Expr::col(accounts::Column::Balance).sub(amount.minor()),
            )
            .col_expr(accounts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(accounts::Column::Id.eq(account.id.to_string()))
            .filter(accounts::Column::IsActive.eq(true))
            .filter(accounts::Column::Balance.gte(min_balance.minor()))
            .exec(uow.db())
            .await?;
        if result.rows_affected == 0 {
            tracing::warn!(account_id = %account.id, amount = amount.minor(), "debit rejected");
            return Err(EngineError::InsufficientFunds(format!(
                "account {} can not cover {}",
                account.account_number,
                amount.format(account.currency)
            )));
        }
        load_account(uow.db(), account.id).await
    }

    /// Draws account numbers until one is free.
    async fn unique_account_number(&self, uow: &UnitOfWork) -> ResultEngine<String> {
        for attempt in 1..=self.max_id_attempts {
            let candidate = self.ids.account_number();
            let taken = accounts::Entity::find()
                .filter(accounts::Column::AccountNumber.eq(candidate.clone()))
                .one(uow.db())
                .await?
                .is_some();
            if !taken {
                return Ok(candidate);
            }
            tracing::debug!(attempt, "account number collision, regenerating");
        }
        Err(EngineError::Conflict(
            "could not allocate a unique account number".to_string(),
        ))
    }

    /// Opens an account with a fresh account number.
    ///
    /// A positive initial deposit is recorded as an opening `deposit`
    /// transaction in the same unit of work.
    pub async fn open_account(&self, cmd: OpenAccountCmd) -> ResultEngine<Account> {
        if cmd.initial_deposit.is_negative() {
            return Err(EngineError::InvalidState(
                "initial deposit must be >= 0".to_string(),
            ));
        }
        match (cmd.account_type.is_credit(), cmd.credit) {
            (true, None) => {
                return Err(EngineError::InvalidState(
                    "credit accounts require credit terms".to_string(),
                ));
            }
            (true, Some(terms)) if terms.credit_limit.is_negative() => {
                return Err(EngineError::InvalidState(
                    "credit limit must be >= 0".to_string(),
                ));
            }
            (false, Some(_)) => {
                return Err(EngineError::InvalidState(format!(
                    "{} accounts do not take credit terms",
                    cmd.account_type.as_str()
                )));
            }
            _ => {}
        }
        let nickname = normalize_optional_text(cmd.nickname.as_deref());

        with_uow!(self, |uow| {
            let account_number = self.unique_account_number(&uow).await?;
            let now = Utc::now();
            let account = Account {
                id: Uuid::new_v4(),
                account_number,
                owner_id: cmd.owner_id.clone(),
                nickname,
                account_type: cmd.account_type,
                balance: cmd.initial_deposit,
                currency: cmd.currency,
                is_active: true,
                credit: cmd.credit,
                created_at: now,
                updated_at: now,
            };
            accounts::ActiveModel::from(&account)
                .insert(uow.db())
                .await?;

            if account.balance.is_positive() {
                self.record(
                    &uow,
                    NewTransaction::new(
                        &account.owner_id,
                        TransactionKind::Deposit,
                        account.balance,
                        account.currency,
                    )
                    .to_account(account.id)
                    .description(Some("Opening deposit".to_string())),
                )
                .await?;
            }

            tracing::info!(
                account_id = %account.id,
                account_number = %account.account_number,
                kind = account.account_type.as_str(),
                "account opened"
            );
            uow.notify(Notification::new(
                &account.owner_id,
                "Account opened",
                format!(
                    "Your {} account {} is open with a balance of {}.",
                    account.account_type.as_str(),
                    account.account_number,
                    account.balance.format(account.currency)
                ),
                NotificationCategory::Account,
            ));
            Ok(account)
        })
    }

    /// Returns an account snapshot, active or not.
    pub async fn account(&self, actor: &Actor, account_id: Uuid) -> ResultEngine<Account> {
        let account = load_account(&self.database, account_id).await?;
        if !actor.can_access(&account.owner_id) {
            return Err(EngineError::Unauthorized(format!("account {account_id}")));
        }
        Ok(account)
    }

    /// Lists the accounts of an owner, oldest first.
    pub async fn accounts_for_owner(
        &self,
        owner_id: &str,
        include_inactive: bool,
    ) -> ResultEngine<Vec<Account>> {
        let mut query =
            accounts::Entity::find().filter(accounts::Column::OwnerId.eq(owner_id.to_string()));
        if !include_inactive {
            query = query.filter(accounts::Column::IsActive.eq(true));
        }
        query
            .order_by_asc(accounts::Column::CreatedAt)
            .order_by_asc(accounts::Column::AccountNumber)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    /// Closes an active account. The balance must be exactly zero.
    pub async fn close_account(&self, actor: &Actor, account_id: Uuid) -> ResultEngine<Account> {
        with_uow!(self, |uow| {
            let account = load_account(uow.db(), account_id).await?;
            if !actor.can_access(&account.owner_id) {
                return Err(EngineError::Unauthorized(format!("account {account_id}")));
            }
            if !account.is_active {
                return Err(EngineError::InvalidState(
                    "account already closed".to_string(),
                ));
            }
            if !account.balance.is_zero() {
                return Err(EngineError::InvalidState(format!(
                    "balance must be zero to close, got {}",
                    account.balance.format(account.currency)
                )));
            }

            let model = accounts::ActiveModel {
                id: ActiveValue::Set(account_id.to_string()),
                is_active: ActiveValue::Set(false),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            }
            .update(uow.db())
            .await?;
            let closed = Account::try_from(model)?;

            tracing::info!(account_id = %closed.id, "account closed");
            uow.notify(Notification::new(
                &closed.owner_id,
                "Account closed",
                format!("Account {} has been closed.", closed.account_number),
                NotificationCategory::Account,
            ));
            Ok(closed)
        })
    }

    /// Sets or clears the nickname of an active account.
    pub async fn rename_account(
        &self,
        actor: &Actor,
        account_id: Uuid,
        nickname: Option<&str>,
    ) -> ResultEngine<Account> {
        let nickname = normalize_optional_text(nickname);
        with_uow!(self, |uow| {
            let account = self.find_owned_active(&uow, account_id, actor).await?;
            let model = accounts::ActiveModel {
                id: ActiveValue::Set(account.id.to_string()),
                nickname: ActiveValue::Set(nickname),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            }
            .update(uow.db())
            .await?;
            Account::try_from(model)
        })
    }
}
