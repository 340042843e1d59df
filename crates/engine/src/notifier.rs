//! Outbound notifications.
//!
//! The engine queues a [`Notification`] inside the unit of work and hands it
//! to the configured [`Notifier`] only after the unit of work has committed.
//! Delivery is best effort: an error is logged and dropped, it never undoes a
//! committed mutation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Transaction,
    BillPayment,
    Account,
}

impl NotificationCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transaction => "transaction",
            Self::BillPayment => "bill_payment",
            Self::Account => "account",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub owner_id: String,
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
}

impl Notification {
    pub fn new(
        owner_id: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        category: NotificationCategory,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            title: title.into(),
            message: message.into(),
            category,
        }
    }
}

#[derive(Error, Debug)]
#[error("notification delivery failed: {0}")]
pub struct NotifierError(pub String);

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifierError>;
}

/// Discards every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _notification: &Notification) -> Result<(), NotifierError> {
        Ok(())
    }
}

/// Emits every notification as a structured `tracing` event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifierError> {
        tracing::info!(
            owner_id = %notification.owner_id,
            category = notification.category.as_str(),
            title = %notification.title,
            "{}",
            notification.message
        );
        Ok(())
    }
}
