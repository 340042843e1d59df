//! Funds-movement core.
//!
//! [`Engine`] moves money between accounts, records an immutable
//! [`Transaction`] for every executed mutation and runs the
//! [`BillPayment`] life cycle. Every write operation is one [`UnitOfWork`]:
//! it either commits completely or leaves the store untouched.

pub use accounts::{Account, AccountType, CreditTerms};
pub use bill_payments::{BillPayment, BillStatus, DEFAULT_REMINDER_DAYS, Frequency};
pub use commands::{
    Actor, BillPaymentUpdate, DepositCmd, OpenAccountCmd, ScheduleBillCmd, TransferCmd, TxMeta,
    WithdrawCmd,
};
pub use currency::Currency;
pub use error::EngineError;
pub use ids::{IdGenerator, RandomIds, is_account_number, is_transaction_id};
pub use money::Money;
pub use notifier::{
    NoopNotifier, Notification, NotificationCategory, Notifier, NotifierError, TracingNotifier,
};
pub use ops::{BillPaymentFilter, DEFAULT_MAX_ID_ATTEMPTS, Engine, EngineBuilder, TransactionListFilter};
pub use transactions::{Transaction, TransactionKind, TransactionStatus};
pub use uow::UnitOfWork;

mod accounts;
mod bill_payments;
mod commands;
mod currency;
mod error;
pub mod ids;
mod money;
mod notifier;
mod ops;
mod transactions;
mod uow;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
