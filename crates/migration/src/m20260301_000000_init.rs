//! Initial schema.
//!
//! - `accounts`: balances, one row per account, unique account number
//! - `transactions`: immutable ledger records, unique `TX…` id
//! - `bill_payments`: scheduled obligations funded by an account

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    AccountNumber,
    OwnerId,
    Nickname,
    AccountType,
    Balance,
    Currency,
    IsActive,
    CreditLimit,
    MinimumPayment,
    CreditDueDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    TransactionId,
    OwnerId,
    FromAccount,
    ToAccount,
    Kind,
    AmountMinor,
    Currency,
    Status,
    Description,
    Category,
    Payee,
    Reference,
    CreatedAt,
}

#[derive(Iden)]
enum BillPayments {
    Table,
    Id,
    OwnerId,
    AccountId,
    Payee,
    AmountMinor,
    DueDate,
    Status,
    Frequency,
    Description,
    Category,
    PaymentDate,
    ReminderEnabled,
    ReminderDays,
    CreatedAt,
    UpdatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Accounts::AccountNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Accounts::OwnerId).string().not_null())
                    .col(ColumnDef::new(Accounts::Nickname).string())
                    .col(ColumnDef::new(Accounts::AccountType).string().not_null())
                    .col(
                        ColumnDef::new(Accounts::Balance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Accounts::Currency)
                            .string()
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(Accounts::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Accounts::CreditLimit).big_integer())
                    .col(ColumnDef::new(Accounts::MinimumPayment).big_integer())
                    .col(ColumnDef::new(Accounts::CreditDueDate).date())
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Accounts::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-owner_id")
                    .table(Accounts::Table)
                    .col(Accounts::OwnerId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Transactions::TransactionId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Transactions::OwnerId).string().not_null())
                    .col(ColumnDef::new(Transactions::FromAccount).string())
                    .col(ColumnDef::new(Transactions::ToAccount).string())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Currency).string().not_null())
                    .col(ColumnDef::new(Transactions::Status).string().not_null())
                    .col(ColumnDef::new(Transactions::Description).string())
                    .col(ColumnDef::new(Transactions::Category).string())
                    .col(ColumnDef::new(Transactions::Payee).string())
                    .col(ColumnDef::new(Transactions::Reference).string())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-from_account")
                            .from(Transactions::Table, Transactions::FromAccount)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-to_account")
                            .from(Transactions::Table, Transactions::ToAccount)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-owner_id-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::OwnerId)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-from_account")
                    .table(Transactions::Table)
                    .col(Transactions::FromAccount)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-to_account")
                    .table(Transactions::Table)
                    .col(Transactions::ToAccount)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Bill payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(BillPayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BillPayments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BillPayments::OwnerId).string().not_null())
                    .col(ColumnDef::new(BillPayments::AccountId).string().not_null())
                    .col(ColumnDef::new(BillPayments::Payee).string().not_null())
                    .col(
                        ColumnDef::new(BillPayments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BillPayments::DueDate).date().not_null())
                    .col(
                        ColumnDef::new(BillPayments::Status)
                            .string()
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(
                        ColumnDef::new(BillPayments::Frequency)
                            .string()
                            .not_null()
                            .default("one-time"),
                    )
                    .col(ColumnDef::new(BillPayments::Description).string())
                    .col(ColumnDef::new(BillPayments::Category).string())
                    .col(ColumnDef::new(BillPayments::PaymentDate).timestamp())
                    .col(
                        ColumnDef::new(BillPayments::ReminderEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(BillPayments::ReminderDays)
                            .integer()
                            .not_null()
                            .default(3),
                    )
                    .col(
                        ColumnDef::new(BillPayments::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BillPayments::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-bill_payments-account_id")
                            .from(BillPayments::Table, BillPayments::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-bill_payments-owner_id-status-due_date")
                    .table(BillPayments::Table)
                    .col(BillPayments::OwnerId)
                    .col(BillPayments::Status)
                    .col(BillPayments::DueDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Reverse order of creation (FK dependencies)
        manager
            .drop_table(Table::drop().table(BillPayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}
