use std::fs::File;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::LedgerService;
use crate::domain::{format_amount, parse_amount};
use crate::io::{ImportResult, Importer};

/// Saldo - account ledger with atomic transfers and reversals
#[derive(Parser)]
#[command(name = "saldo")]
#[command(about = "An embedded account ledger with atomic transfers and reversals")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "saldo.db")]
    pub database: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Seed accounts from a JSON or CSV file
    Seed {
        /// Seed file path
        file: String,

        /// File format: json, csv
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Create a single account
    Account {
        /// Display name
        name: String,

        /// Opening balance (e.g., "100.00")
        #[arg(short, long, default_value = "0")]
        balance: String,
    },

    /// List all accounts with balances
    Accounts,

    /// Show the balance of one account
    Balance {
        /// Account id
        id: String,
    },

    /// Transfer an amount between two accounts
    Transfer {
        /// Amount to transfer (e.g., "30.00")
        amount: String,

        /// Sender account id
        #[arg(long)]
        from: String,

        /// Receiver account id
        #[arg(long)]
        to: String,

        /// Description of the transfer
        #[arg(short, long)]
        details: Option<String>,
    },

    /// Reverse a committed transfer
    Reverse {
        /// Transaction id
        id: String,
    },

    /// Show one transaction
    Show {
        /// Transaction id
        id: String,
    },

    /// List all transactions in insertion order
    Transactions,

    /// Verify ledger integrity
    Check,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Seed { file, format } => {
                let service = LedgerService::connect(&self.database).await?;
                let importer = Importer::new(&service);
                let reader =
                    File::open(&file).with_context(|| format!("Cannot open seed file {file}"))?;

                let result = match format.as_str() {
                    "json" => importer.seed_accounts_json(reader).await?,
                    "csv" => importer.seed_accounts_csv(reader).await?,
                    other => bail!("Unknown seed format '{other}'. Use 'json' or 'csv'"),
                };

                print_import_result(&result);
            }

            Commands::Account { name, balance } => {
                let service = LedgerService::connect(&self.database).await?;
                let opening_balance = parse_amount(&balance)
                    .context("Invalid balance format. Use '100.00' or '100'")?;
                let account = service.create_account(name, opening_balance).await?;
                println!(
                    "Created account {} ({}) with balance {}",
                    account.id,
                    account.name,
                    format_amount(account.balance)
                );
            }

            Commands::Accounts => {
                let service = LedgerService::connect(&self.database).await?;
                let accounts = service.list_accounts().await?;
                if accounts.is_empty() {
                    println!("No accounts. Seed some with 'saldo seed'.");
                }
                for account in accounts {
                    println!(
                        "{}  {:>12}  {}",
                        account.id,
                        format_amount(account.balance),
                        account.name
                    );
                }
            }

            Commands::Balance { id } => {
                let service = LedgerService::connect(&self.database).await?;
                let id = parse_account_id(&id)?;
                let balance = service.get_balance(id).await?;
                println!("{}", format_amount(balance));
            }

            Commands::Transfer {
                amount,
                from,
                to,
                details,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let amount =
                    parse_amount(&amount).context("Invalid amount format. Use '30.00' or '30'")?;
                let sender = parse_account_id(&from)?;
                let receiver = parse_account_id(&to)?;

                let receipt = service.transfer(sender, receiver, amount, details).await?;
                println!("Transaction {}", receipt.transaction.id);
                println!(
                    "  {} -> {}  {}",
                    sender,
                    receiver,
                    format_amount(receipt.transaction.amount)
                );
                println!("  sender balance:   {}", format_amount(receipt.sender_balance));
                println!(
                    "  receiver balance: {}",
                    format_amount(receipt.receiver_balance)
                );
            }

            Commands::Reverse { id } => {
                let service = LedgerService::connect(&self.database).await?;
                let id = parse_transaction_id(&id)?;
                let receipt = service.reverse(id).await?;
                println!("Reversed transaction {}", receipt.reversed.id);
                println!("  sender balance:   {}", format_amount(receipt.sender_balance));
                println!(
                    "  receiver balance: {}",
                    format_amount(receipt.receiver_balance)
                );
            }

            Commands::Show { id } => {
                let service = LedgerService::connect(&self.database).await?;
                let id = parse_transaction_id(&id)?;
                let tx = service.get_transaction(id).await?;
                println!("Transaction {}", tx.id);
                println!("  sender:   {}", tx.sender);
                println!("  receiver: {}", tx.receiver);
                println!("  amount:   {}", format_amount(tx.amount));
                println!("  details:  {}", tx.details.as_deref().unwrap_or("-"));
                println!("  recorded: {}", tx.recorded_at.to_rfc3339());
            }

            Commands::Transactions => {
                let service = LedgerService::connect(&self.database).await?;
                let transactions = service.list_transactions().await?;
                if transactions.is_empty() {
                    println!("No transactions.");
                }
                for tx in transactions {
                    println!(
                        "{}  {} -> {}  {:>12}  {}",
                        tx.id,
                        tx.sender,
                        tx.receiver,
                        format_amount(tx.amount),
                        tx.details.as_deref().unwrap_or("")
                    );
                }
            }

            Commands::Check => {
                let service = LedgerService::connect(&self.database).await?;
                let report = service.check_integrity().await?;
                println!("Accounts:      {}", report.account_count);
                println!("Transactions:  {}", report.transaction_count);
                println!("Total balance: {}", format_amount(report.total_balance));
                if report.has_sequence_gaps {
                    println!("Sequence gaps: yes (reversals deleted records)");
                }
                if report.is_clean() {
                    println!("Ledger OK");
                } else {
                    for (id, balance) in &report.negative_balances {
                        println!("NEGATIVE BALANCE: {} = {}", id, format_amount(*balance));
                    }
                    if report.dangling_references > 0 {
                        println!(
                            "DANGLING REFERENCES: {} transaction(s)",
                            report.dangling_references
                        );
                    }
                    if report.invalid_amounts > 0 {
                        println!("INVALID AMOUNTS: {} transaction(s)", report.invalid_amounts);
                    }
                    bail!("Ledger integrity check failed");
                }
            }
        }

        Ok(())
    }
}

fn parse_account_id(input: &str) -> Result<Uuid> {
    Uuid::parse_str(input.trim()).with_context(|| format!("Invalid account id '{input}'"))
}

fn parse_transaction_id(input: &str) -> Result<Uuid> {
    Uuid::parse_str(input.trim()).with_context(|| format!("Invalid transaction id '{input}'"))
}

fn print_import_result(result: &ImportResult) {
    println!(
        "Seeded {} account(s), {} skipped, {} error(s)",
        result.imported,
        result.skipped,
        result.errors.len()
    );
    for error in &result.errors {
        match &error.field {
            Some(field) => println!("  record {} [{}]: {}", error.record, field, error.error),
            None => println!("  record {}: {}", error.record, error.error),
        }
    }
}
