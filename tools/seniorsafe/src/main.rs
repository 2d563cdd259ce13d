//! SeniorSafe payment simulator.
//!
//! Practice wallet for learning UPI-style QR payments without real money.
//! State lives in a JSON snapshot under the user's data directory unless
//! `data_file` is set in the config.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use seniorsafe_common::classify::Classifier;
use seniorsafe_common::config::SimulatorConfig;
use seniorsafe_common::currency::format_amount;
use seniorsafe_common::directory::{ContactDirectory, ContactId};
use seniorsafe_common::identity::{OwnerId, SessionProfile};
use seniorsafe_common::intent::{parse_payload, resolve_counterparty, IntentKind, PaymentIntent};
use seniorsafe_common::session::start_session;
use seniorsafe_common::store::JsonFileStore;
use seniorsafe_common::transfer::TransferExecutor;
use seniorsafe_common::wallet::TransactionKind;
use seniorsafe_common::wallet_backend::LedgerStore;

#[derive(Parser)]
#[command(name = "seniorsafe", about = "Practice QR payments with a pretend wallet")]
struct Cli {
    /// Account to act as.
    #[arg(long, env = "SENIORSAFE_OWNER")]
    owner: String,

    /// Display name used when the account is first created.
    #[arg(long, env = "SENIORSAFE_NAME")]
    name: Option<String>,

    /// TOML config file.
    #[arg(long, env = "SENIORSAFE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the wallet balance.
    Balance,
    /// Show recent transactions, newest first.
    History {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Manage saved contacts.
    #[command(subcommand)]
    Contacts(ContactsCommand),
    /// Inspect a QR payload without paying.
    Scan {
        /// Payload text, or `-` to read stdin.
        payload: String,
    },
    /// Pay (or redeem) a QR payload.
    Pay {
        /// Payload text, or `-` to read stdin.
        payload: String,
        /// Amount to pay when the payload has none.
        #[arg(long)]
        amount: Option<Decimal>,
        /// Wallet PIN, required once one is set.
        #[arg(long)]
        pin: Option<String>,
    },
    /// Set or replace the wallet PIN (4 or 6 digits).
    SetPin { pin: String },
    /// Totals across every account in the data file.
    Stats,
}

#[derive(Subcommand)]
enum ContactsCommand {
    List,
    Add { name: String, phone: String },
    Rename { id: ContactId, name: String },
    Phone { id: ContactId, phone: String },
    Remove { id: ContactId },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => SimulatorConfig::load(path)?,
        None => SimulatorConfig::default(),
    };
    let data_file = match &config.data_file {
        Some(path) => path.clone(),
        None => default_data_file()?,
    };
    let store = JsonFileStore::from_config(&data_file, &config)
        .with_context(|| format!("opening {}", data_file.display()))?;

    let owner = OwnerId::new(cli.owner.trim());
    if owner.as_str().is_empty() {
        bail!("--owner must not be empty");
    }
    let profile = SessionProfile {
        display_name: cli.name.unwrap_or_else(|| owner.to_string()),
        owner_id: owner.clone(),
    };
    let session = start_session(&store, &config, &profile)?;
    if session.created {
        println!(
            "Welcome {}! Your practice wallet has {}.",
            profile.display_name,
            format_amount(session.wallet.balance)
        );
    }

    let classifier = Classifier::from_config(&config);
    match cli.command {
        Command::Balance => {
            println!("{}", format_amount(store.balance(&owner)?));
        }
        Command::History { limit } => {
            let txs = store.transactions(&owner, limit.unwrap_or(config.history_limit))?;
            if txs.is_empty() {
                println!("No transactions yet.");
            }
            for tx in txs {
                let sign = match tx.kind {
                    TransactionKind::Credit => '+',
                    TransactionKind::Debit => '-',
                };
                println!(
                    "{}  {sign}{}  {}",
                    tx.created_at.format("%Y-%m-%d %H:%M"),
                    format_amount(tx.amount),
                    tx.description
                );
            }
        }
        Command::Contacts(cmd) => run_contacts(&store, &owner, cmd)?,
        Command::Scan { payload } => {
            let intent = scan(&store, &owner, &payload)?;
            let verdict = classifier.classify(&intent);
            println!("kind: {}", intent.kind);
            if let Some(name) = &intent.counterparty_name {
                println!("to: {name}");
            }
            match intent.amount {
                Some(amount) => println!("amount: {}", format_amount(amount)),
                None => println!("amount: (not stated)"),
            }
            if let Some(target) = intent.link_target() {
                println!("link: {target}");
            }
            let reasons: Vec<&str> = verdict.reasons.iter().map(|r| r.as_str()).collect();
            println!("risk: {} ({})", verdict.risk, reasons.join(", "));
        }
        Command::Pay {
            payload,
            amount,
            pin,
        } => {
            let intent = scan(&store, &owner, &payload)?;
            let Some(amount) = amount.or(intent.amount) else {
                bail!("payload does not state an amount; pass --amount");
            };
            let mut executor = TransferExecutor::new(&store, &classifier);
            if let Some(pin) = pin.as_deref() {
                executor = executor.with_pin(pin);
            }
            let tx = executor.execute(&owner, &intent, amount)?;
            let verb = match intent.kind {
                IntentKind::CashVoucher => "Received",
                _ => "Sent",
            };
            println!("{verb} {}. {}", format_amount(tx.amount), tx.description);
            println!("Balance: {}", format_amount(store.balance(&owner)?));
        }
        Command::SetPin { pin } => {
            store.set_pin(&owner, &pin)?;
            println!("PIN updated.");
        }
        Command::Stats => {
            let stats = store.stats()?;
            println!("users: {}", stats.total_users);
            println!("total balance: {}", format_amount(stats.total_balance));
            println!("transactions: {}", stats.total_transactions);
        }
    }
    Ok(())
}

fn run_contacts(store: &JsonFileStore, owner: &OwnerId, cmd: ContactsCommand) -> Result<()> {
    let contact = match cmd {
        ContactsCommand::List => {
            for c in store.contacts(owner)? {
                println!("{:>4}  {:<24} {}", c.id, c.name, c.phone);
            }
            return Ok(());
        }
        ContactsCommand::Add { name, phone } => store.add_contact(owner, &name, &phone)?,
        ContactsCommand::Rename { id, name } => store.rename_contact(owner, id, &name)?,
        ContactsCommand::Phone { id, phone } => store.update_phone(owner, id, &phone)?,
        ContactsCommand::Remove { id } => {
            let removed = store.remove_contact(owner, id)?;
            println!("Removed {}.", removed.name);
            return Ok(());
        }
    };
    println!("{:>4}  {:<24} {}", contact.id, contact.name, contact.phone);
    Ok(())
}

fn scan(store: &JsonFileStore, owner: &OwnerId, payload: &str) -> Result<PaymentIntent> {
    let raw = if payload == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading payload from stdin")?;
        buf
    } else {
        payload.to_string()
    };
    Ok(resolve_counterparty(store, owner, parse_payload(&raw)))
}

fn default_data_file() -> Result<PathBuf> {
    let base = dirs::data_dir().context("no data directory for this user; set data_file in the config")?;
    Ok(base.join("seniorsafe").join("ledger.json"))
}
