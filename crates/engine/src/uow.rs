//! Unit of work.
//!
//! A [`UnitOfWork`] is one storage transaction plus the notifications the
//! operation wants to send once that transaction is durable. Nothing written
//! through it is visible to other units of work before [`UnitOfWork::commit`];
//! [`UnitOfWork::rollback`] (or dropping it) discards the writes together with
//! the queued notifications.

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::{Notification, ResultEngine};

#[derive(Debug)]
pub struct UnitOfWork {
    tx: DatabaseTransaction,
    outbox: Vec<Notification>,
}

impl UnitOfWork {
    pub(crate) async fn begin(database: &DatabaseConnection) -> ResultEngine<Self> {
        Ok(Self {
            tx: database.begin().await?,
            outbox: Vec::new(),
        })
    }

    /// Connection to run reads and writes on.
    pub fn db(&self) -> &DatabaseTransaction {
        &self.tx
    }

    /// Queue a notification to be delivered after commit.
    pub fn notify(&mut self, notification: Notification) {
        self.outbox.push(notification);
    }

    /// Commits the storage transaction and returns the queued notifications.
    pub async fn commit(self) -> ResultEngine<Vec<Notification>> {
        self.tx.commit().await?;
        Ok(self.outbox)
    }

    /// Discards every write and every queued notification.
    pub async fn rollback(self) -> ResultEngine<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
