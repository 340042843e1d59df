use std::{fmt, sync::Arc};

use sea_orm::DatabaseConnection;

use crate::{IdGenerator, Notification, Notifier, RandomIds, ResultEngine, TracingNotifier, UnitOfWork};

mod accounts;
mod bills;
mod recorder;
mod transfers;

pub use bills::BillPaymentFilter;
pub use recorder::TransactionListFilter;

/// How many candidates are drawn for an account number or transaction id
/// before giving up with `Conflict`.
pub const DEFAULT_MAX_ID_ATTEMPTS: u32 = 8;

/// Run a block inside a unit of work, committing on success and rolling back
/// on error. Queued notifications are delivered only after the commit.
///
/// An early return through `?` inside the block drops the unit of work, which
/// rolls the storage transaction back as well.
macro_rules! with_uow {
    ($self:expr, |$uow:ident| $body:expr) => {{
        #[allow(unused_mut)]
        let mut $uow = $self.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                let outbox = $uow.commit().await?;
                $self.dispatch(outbox).await;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = $uow.rollback().await {
                    tracing::warn!("rollback failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }};
}

pub(crate) use with_uow;

pub struct Engine {
    database: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
    ids: Arc<dyn IdGenerator>,
    max_id_attempts: u32,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .field("max_id_attempts", &self.max_id_attempts)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Opens a unit of work on the ledger store.
    pub async fn begin(&self) -> ResultEngine<UnitOfWork> {
        UnitOfWork::begin(&self.database).await
    }

    /// Hands committed notifications to the notifier. Failures are logged
    /// and swallowed.
    pub async fn dispatch(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            if let Err(err) = self.notifier.notify(&notification).await {
                tracing::warn!(
                    owner_id = %notification.owner_id,
                    category = notification.category.as_str(),
                    "{err}"
                );
            }
        }
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
    ids: Arc<dyn IdGenerator>,
    max_id_attempts: u32,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            notifier: Arc::new(TracingNotifier),
            ids: Arc::new(RandomIds),
            max_id_attempts: DEFAULT_MAX_ID_ATTEMPTS,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Replace the default `TracingNotifier`.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> EngineBuilder {
        self.notifier = notifier;
        self
    }

    /// Replace the default `RandomIds` generator.
    pub fn ids(mut self, ids: Arc<dyn IdGenerator>) -> EngineBuilder {
        self.ids = ids;
        self
    }

    pub fn max_id_attempts(mut self, attempts: u32) -> EngineBuilder {
        self.max_id_attempts = attempts.max(1);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            notifier: self.notifier,
            ids: self.ids,
            max_id_attempts: self.max_id_attempts,
        })
    }
}
