use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{Condition, QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{
    Actor, EngineError, ResultEngine, Transaction, TransactionKind, TransactionStatus, UnitOfWork,
    transactions::{self, NewTransaction},
    util::require_positive,
};

use super::Engine;

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    /// Only transactions touching this account, as source or destination.
    pub account_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<TransactionKind>>,
    pub limit: Option<u64>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidState(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.kinds.as_ref().is_some_and(|k| k.is_empty()) {
        return Err(EngineError::InvalidState(
            "kinds must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Writes a completed transaction inside `uow`.
    ///
    /// The human-facing id is redrawn while it collides with a stored one.
    pub(crate) async fn record(
        &self,
        uow: &UnitOfWork,
        new: NewTransaction,
    ) -> ResultEngine<Transaction> {
        require_positive(new.amount, "transaction amount")?;
        if new.from_account.is_none() && new.to_account.is_none() {
            return Err(EngineError::InvalidState(
                "transaction must reference an account".to_string(),
            ));
        }

        let now = Utc::now();
        let transaction_id = self.unique_transaction_id(uow, now).await?;
        let tx = Transaction {
            id: Uuid::new_v4(),
            transaction_id,
            owner_id: new.owner_id,
            from_account: new.from_account,
            to_account: new.to_account,
            kind: new.kind,
            amount: new.amount,
            currency: new.currency,
            status: TransactionStatus::Completed,
            description: new.description,
            category: new.category,
            payee: new.payee,
            reference: new.reference,
            created_at: now,
        };
        transactions::ActiveModel::from(&tx).insert(uow.db()).await?;
        Ok(tx)
    }

    async fn unique_transaction_id(
        &self,
        uow: &UnitOfWork,
        now: DateTime<Utc>,
    ) -> ResultEngine<String> {
        for attempt in 1..=self.max_id_attempts {
            let candidate = self.ids.transaction_id(now);
            let taken = transactions::Entity::find()
                .filter(transactions::Column::TransactionId.eq(candidate.clone()))
                .one(uow.db())
                .await?
                .is_some();
            if !taken {
                return Ok(candidate);
            }
            tracing::debug!(attempt, "transaction id collision, regenerating");
        }
        Err(EngineError::Conflict(
            "could not allocate a unique transaction id".to_string(),
        ))
    }

    /// Returns a transaction by its opaque id.
    pub async fn transaction(&self, actor: &Actor, id: Uuid) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("transaction {id}")))?;
        if !actor.can_access(&model.owner_id) {
            return Err(EngineError::Unauthorized(format!("transaction {id}")));
        }
        Transaction::try_from(model)
    }

    /// Returns a transaction by its human-facing `TX…` id.
    pub async fn transaction_by_reference(
        &self,
        actor: &Actor,
        transaction_id: &str,
    ) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find()
            .filter(transactions::Column::TransactionId.eq(transaction_id.to_string()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("transaction {transaction_id}")))?;
        if !actor.can_access(&model.owner_id) {
            return Err(EngineError::Unauthorized(format!(
                "transaction {transaction_id}"
            )));
        }
        Transaction::try_from(model)
    }

    /// Lists the actor's transactions, newest first.
    ///
    /// When `account_id` is set the account must be accessible to the actor,
    /// and transfers received from other owners are included.
    pub async fn list_transactions(
        &self,
        actor: &Actor,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        validate_list_filter(filter)?;

        let mut query = transactions::Entity::find();
        match filter.account_id {
            Some(account_id) => {
                self.account(actor, account_id).await?;
                let id = account_id.to_string();
                query = query.filter(
                    Condition::any()
                        .add(transactions::Column::FromAccount.eq(id.clone()))
                        .add(transactions::Column::ToAccount.eq(id)),
                );
            }
            None => {
                query = query.filter(transactions::Column::OwnerId.eq(actor.owner_id.clone()));
            }
        }
        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::CreatedAt.lt(to));
        }
        if let Some(kinds) = filter.kinds.as_ref() {
            query = query.filter(
                transactions::Column::Kind.is_in(kinds.iter().map(|k| k.as_str().to_string())),
            );
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::TransactionId)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }
}
