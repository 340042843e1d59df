#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Account, AccountType, Actor, Engine, IdGenerator, Money, Notification, Notifier,
    NotifierError, OpenAccountCmd, RandomIds, Transaction, TransactionListFilter,
};
use migration::MigratorTrait;

/// Keeps every delivered notification; can be switched to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifierError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifierError("channel down".to_string()));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Hands out queued ids first, then falls back to random ones. A fixed
/// transaction id makes every draw after the first collide.
#[derive(Default)]
pub struct ScriptedIds {
    account_numbers: Mutex<VecDeque<String>>,
    fixed_transaction_id: Mutex<Option<String>>,
}

impl ScriptedIds {
    pub fn queue_account_numbers(&self, numbers: &[&str]) {
        self.account_numbers
            .lock()
            .unwrap()
            .extend(numbers.iter().map(|n| n.to_string()));
    }

    pub fn fix_transaction_id(&self, id: Option<&str>) {
        *self.fixed_transaction_id.lock().unwrap() = id.map(ToString::to_string);
    }
}

impl IdGenerator for ScriptedIds {
    fn account_number(&self) -> String {
        self.account_numbers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RandomIds.account_number())
    }

    fn transaction_id(&self, now: DateTime<Utc>) -> String {
        self.fixed_transaction_id
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| RandomIds.transaction_id(now))
    }
}

pub struct Harness {
    pub engine: Engine,
    pub db: DatabaseConnection,
    pub notifier: Arc<RecordingNotifier>,
    pub ids: Arc<ScriptedIds>,
}

pub async fn harness() -> Harness {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let ids = Arc::new(ScriptedIds::default());
    let engine = Engine::builder()
        .database(db.clone())
        .notifier(notifier.clone())
        .ids(ids.clone())
        .max_id_attempts(4)
        .build()
        .await
        .unwrap();
    Harness {
        engine,
        db,
        notifier,
        ids,
    }
}

pub async fn open_checking(engine: &Engine, owner: &str, balance: i64) -> Account {
    engine
        .open_account(
            OpenAccountCmd::new(owner, AccountType::Checking).initial_deposit(Money::new(balance)),
        )
        .await
        .unwrap()
}

pub async fn balance(engine: &Engine, account: &Account) -> Money {
    engine
        .account(&Actor::admin("ops"), account.id)
        .await
        .unwrap()
        .balance
}

pub async fn history(engine: &Engine, owner: &str) -> Vec<Transaction> {
    engine
        .list_transactions(&Actor::owner(owner), &TransactionListFilter::default())
        .await
        .unwrap()
}
