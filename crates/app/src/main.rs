use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use engine::{
    AccountType, Actor, BillPaymentFilter, BillStatus, CreditTerms, Currency, DepositCmd, Engine,
    Frequency, Money, OpenAccountCmd, ScheduleBillCmd, TransactionListFilter, TransferCmd,
    WithdrawCmd,
};
use migration::{Migrator, MigratorTrait};
use serde::Serialize;
use settings::Database;
use uuid::Uuid;

mod settings;

type AppResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "bankcore")]
#[command(about = "Accounts, transfers and bill payments")]
struct Cli {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,

    /// Caller identity.
    #[arg(long, global = true, env = "BANKCORE_OWNER", default_value = "")]
    owner: String,

    /// Act with elevated capability (skips ownership checks).
    #[arg(long, global = true)]
    admin: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    OpenAccount(OpenAccountArgs),
    Deposit(MoveArgs),
    Withdraw(MoveArgs),
    Transfer(TransferArgs),
    ScheduleBill(ScheduleBillArgs),
    PayBill(BillIdArgs),
    CancelBill(BillIdArgs),
    Accounts(AccountsArgs),
    Bills(BillsArgs),
    History(HistoryArgs),
}

#[derive(Args, Debug)]
struct OpenAccountArgs {
    #[arg(long = "type", value_parser = parse_account_type)]
    account_type: AccountType,
    #[arg(long, default_value = "USD", value_parser = parse_currency)]
    currency: Currency,
    /// Opening deposit in major units (e.g. 50.00).
    #[arg(long)]
    initial: Option<String>,
    #[arg(long)]
    nickname: Option<String>,
    /// Credit accounts only, in major units.
    #[arg(long)]
    credit_limit: Option<String>,
    #[arg(long)]
    minimum_payment: Option<String>,
}

#[derive(Args, Debug)]
struct MoveArgs {
    #[arg(long)]
    account: Uuid,
    #[arg(long)]
    amount: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    category: Option<String>,
}

#[derive(Args, Debug)]
struct TransferArgs {
    #[arg(long)]
    from: Uuid,
    #[arg(long)]
    to: Uuid,
    #[arg(long)]
    amount: String,
    #[arg(long)]
    description: Option<String>,
}

#[derive(Args, Debug)]
struct ScheduleBillArgs {
    #[arg(long)]
    account: Uuid,
    #[arg(long)]
    payee: String,
    #[arg(long)]
    amount: String,
    /// Due date, `YYYY-MM-DD`.
    #[arg(long)]
    due: NaiveDate,
    #[arg(long, default_value = "one-time", value_parser = parse_frequency)]
    frequency: Frequency,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    category: Option<String>,
}

#[derive(Args, Debug)]
struct BillIdArgs {
    #[arg(long)]
    id: Uuid,
}

#[derive(Args, Debug)]
struct AccountsArgs {
    #[arg(long)]
    include_closed: bool,
}

#[derive(Args, Debug)]
struct BillsArgs {
    #[arg(long, value_parser = parse_bill_status)]
    status: Option<BillStatus>,
    /// Only scheduled bills due within this many days.
    #[arg(long)]
    upcoming: Option<u64>,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    #[arg(long)]
    account: Option<Uuid>,
    #[arg(long)]
    limit: Option<u64>,
}

fn parse_account_type(raw: &str) -> Result<AccountType, String> {
    AccountType::try_from(raw).map_err(|err| err.to_string())
}

fn parse_currency(raw: &str) -> Result<Currency, String> {
    Currency::try_from(raw.to_uppercase().as_str()).map_err(|err| err.to_string())
}

fn parse_frequency(raw: &str) -> Result<Frequency, String> {
    Frequency::try_from(raw).map_err(|err| err.to_string())
}

fn parse_bill_status(raw: &str) -> Result<BillStatus, String> {
    BillStatus::try_from(raw).map_err(|err| err.to_string())
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "bankcore={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    if cli.owner.trim().is_empty() {
        return Err("--owner is required".into());
    }
    let actor = if cli.admin {
        Actor::admin(cli.owner.trim())
    } else {
        Actor::owner(cli.owner.trim())
    };

    let db = parse_database(&settings.database).await?;
    let engine = Engine::builder()
        .database(db)
        .max_id_attempts(settings.engine.max_id_attempts)
        .build()
        .await?;

    run(&engine, actor, cli.command).await
}

async fn run(engine: &Engine, actor: Actor, command: Command) -> AppResult<()> {
    match command {
        Command::OpenAccount(args) => {
            let mut cmd = OpenAccountCmd::new(actor.owner_id.clone(), args.account_type)
                .currency(args.currency);
            if let Some(initial) = args.initial.as_deref() {
                cmd = cmd.initial_deposit(Money::parse(initial, args.currency)?);
            }
            if let Some(nickname) = args.nickname {
                cmd = cmd.nickname(nickname);
            }
            if let Some(limit) = args.credit_limit.as_deref() {
                let minimum_payment = match args.minimum_payment.as_deref() {
                    Some(raw) => Money::parse(raw, args.currency)?,
                    None => Money::ZERO,
                };
                cmd = cmd.credit(CreditTerms {
                    credit_limit: Money::parse(limit, args.currency)?,
                    minimum_payment,
                    due_date: None,
                });
            }
            print_json(&engine.open_account(cmd).await?)
        }
        Command::Deposit(args) => {
            let account = engine.account(&actor, args.account).await?;
            let mut cmd = DepositCmd::new(
                actor,
                args.account,
                Money::parse(&args.amount, account.currency)?,
            );
            if let Some(description) = args.description {
                cmd = cmd.description(description);
            }
            if let Some(category) = args.category {
                cmd = cmd.category(category);
            }
            print_json(&engine.deposit(cmd).await?)
        }
        Command::Withdraw(args) => {
            let account = engine.account(&actor, args.account).await?;
            let mut cmd = WithdrawCmd::new(
                actor,
                args.account,
                Money::parse(&args.amount, account.currency)?,
            );
            if let Some(description) = args.description {
                cmd = cmd.description(description);
            }
            if let Some(category) = args.category {
                cmd = cmd.category(category);
            }
            print_json(&engine.withdraw(cmd).await?)
        }
        Command::Transfer(args) => {
            let source = engine.account(&actor, args.from).await?;
            let mut cmd = TransferCmd::new(
                actor,
                args.from,
                args.to,
                Money::parse(&args.amount, source.currency)?,
            );
            if let Some(description) = args.description {
                cmd = cmd.description(description);
            }
            print_json(&engine.transfer(cmd).await?)
        }
        Command::ScheduleBill(args) => {
            let account = engine.account(&actor, args.account).await?;
            let mut cmd = ScheduleBillCmd::new(
                actor,
                args.account,
                args.payee,
                Money::parse(&args.amount, account.currency)?,
                args.due,
                args.frequency,
            );
            if let Some(description) = args.description {
                cmd = cmd.description(description);
            }
            if let Some(category) = args.category {
                cmd = cmd.category(category);
            }
            print_json(&engine.schedule_bill_payment(cmd).await?)
        }
        Command::PayBill(args) => {
            let (bill, transaction) = engine.pay_bill_now(&actor, args.id).await?;
            print_json(&serde_json::json!({
                "bill_payment": bill,
                "transaction": transaction,
            }))
        }
        Command::CancelBill(args) => print_json(&engine.cancel_bill_payment(&actor, args.id).await?),
        Command::Accounts(args) => print_json(
            &engine
                .accounts_for_owner(&actor.owner_id, args.include_closed)
                .await?,
        ),
        Command::Bills(args) => {
            let bills = match args.upcoming {
                Some(days) => {
                    let horizon = Utc::now()
                        .date_naive()
                        .checked_add_days(chrono::Days::new(days))
                        .ok_or("horizon out of range")?;
                    engine
                        .upcoming_bill_payments(&actor.owner_id, horizon)
                        .await?
                }
                None => {
                    let filter = BillPaymentFilter {
                        status: args.status,
                        ..Default::default()
                    };
                    engine
                        .bill_payments_for_owner(&actor.owner_id, &filter)
                        .await?
                }
            };
            print_json(&bills)
        }
        Command::History(args) => {
            let filter = TransactionListFilter {
                account_id: args.account,
                limit: args.limit,
                ..Default::default()
            };
            print_json(&engine.list_transactions(&actor, &filter).await?)
        }
    }
}

async fn parse_database(config: &Database) -> AppResult<sea_orm::DatabaseConnection> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    tracing::debug!("database ready");
    Ok(database)
}
