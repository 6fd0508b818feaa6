use anyhow::Context;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::domain::{
    build_integrity_report, Account, AccountId, IntegrityReport, Transaction, TransactionId,
};
use crate::storage::Repository;

use super::{AccountLocks, AppError};

/// Application service providing the ledger engine and its query facade.
/// This is the primary interface for any client (CLI, transport layer, etc.).
///
/// Transfers and reversals run as one atomic unit of work: balance reads,
/// balance writes and the transaction-record write commit or roll back
/// together, while per-account locks keep concurrent operations on the
/// same account from interleaving their read-check-write sequences.
pub struct LedgerService {
    repo: Repository,
    locks: AccountLocks,
}

/// Result of a committed transfer.
pub struct TransferReceipt {
    pub transaction: Transaction,
    pub sender_balance: Decimal,
    pub receiver_balance: Decimal,
}

/// Result of a committed reversal. Both balances are back at their
/// pre-transaction values and the record is gone.
pub struct ReversalReceipt {
    pub reversed: Transaction,
    pub sender_balance: Decimal,
    pub receiver_balance: Decimal,
}

/// Outcome of a bulk account seed.
pub struct SeedOutcome {
    pub inserted: usize,
    pub skipped: usize,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            locks: AccountLocks::new(),
        }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let repo = Repository::init(database_path).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let repo = Repository::connect(database_path).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Account operations
    // ========================

    /// Create a single account with an opening balance.
    pub async fn create_account(
        &self,
        name: String,
        opening_balance: Decimal,
    ) -> Result<Account, AppError> {
        if opening_balance < Decimal::ZERO {
            return Err(AppError::InvalidAmount(
                "Opening balance must not be negative".to_string(),
            ));
        }

        let account = Account::new(name, opening_balance);

        let mut tx = self.repo.begin().await?;
        Repository::insert_account(&mut tx, &account).await?;
        tx.commit().await.context("Failed to commit account")?;

        Ok(account)
    }

    /// Bulk-insert seed accounts as one atomic unit of work.
    /// Accounts whose id already exists are counted as skipped.
    pub async fn seed_accounts(&self, accounts: Vec<Account>) -> Result<SeedOutcome, AppError> {
        for account in &accounts {
            if account.balance < Decimal::ZERO {
                return Err(AppError::InvalidAmount(format!(
                    "Account {} has a negative opening balance",
                    account.id
                )));
            }
        }

        let mut inserted = 0;
        let mut skipped = 0;

        let mut tx = self.repo.begin().await?;
        for account in &accounts {
            if Repository::balance_for_update(&mut tx, account.id)
                .await?
                .is_some()
            {
                skipped += 1;
                continue;
            }
            Repository::insert_account(&mut tx, account).await?;
            inserted += 1;
        }
        tx.commit().await.context("Failed to commit seed")?;

        info!(inserted, skipped, "seed accounts committed");

        Ok(SeedOutcome { inserted, skipped })
    }

    /// Get an account by id.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.repo
            .get_account(id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    /// List all accounts.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts().await?)
    }

    /// Get the current balance of an account.
    pub async fn get_balance(&self, id: AccountId) -> Result<Decimal, AppError> {
        Ok(self.get_account(id).await?.balance)
    }

    // ========================
    // Ledger engine operations
    // ========================

    /// Move `amount` from `sender` to `receiver` and record the transaction.
    ///
    /// The balance check, both balance writes and the record insert happen
    /// against the same unit of work; on any failure the whole unit rolls
    /// back and neither balance moves.
    #[instrument(skip(self, details))]
    pub async fn transfer(
        &self,
        sender: AccountId,
        receiver: AccountId,
        amount: Decimal,
        details: Option<String>,
    ) -> Result<TransferReceipt, AppError> {
        if sender == receiver {
            return Err(AppError::SelfTransfer);
        }
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidAmount(
                "Amount must be positive".to_string(),
            ));
        }
        if amount.normalize().scale() > 2 {
            return Err(AppError::InvalidAmount(
                "Amounts carry at most two fractional digits".to_string(),
            ));
        }

        // Critical section: both accounts stay ours until commit or abort.
        let _guard = self.locks.lock_pair(sender, receiver).await;

        let mut tx = self.repo.begin().await?;

        let sender_balance = Repository::balance_for_update(&mut tx, sender)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(sender.to_string()))?;
        let receiver_balance = Repository::balance_for_update(&mut tx, receiver)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(receiver.to_string()))?;

        if sender_balance < amount {
            warn!(balance = %sender_balance, "transfer rejected: insufficient balance");
            return Err(AppError::InsufficientBalance {
                account: sender,
                balance: sender_balance,
                required: amount,
            });
        }

        let new_sender_balance = sender_balance - amount;
        let new_receiver_balance = receiver_balance + amount;

        Repository::set_balance(&mut tx, sender, new_sender_balance).await?;
        Repository::set_balance(&mut tx, receiver, new_receiver_balance).await?;

        let mut transaction = Transaction::new(sender, receiver, amount);
        if let Some(details) = details {
            transaction = transaction.with_details(details);
        }
        Repository::insert_transaction(&mut tx, &mut transaction).await?;

        tx.commit().await.context("Failed to commit transfer")?;

        info!(transaction_id = %transaction.id, "transfer committed");

        Ok(TransferReceipt {
            transaction,
            sender_balance: new_sender_balance,
            receiver_balance: new_receiver_balance,
        })
    }

    /// Undo a committed transfer: restore both balances to their exact
    /// pre-transaction values and delete the record, atomically.
    #[instrument(skip(self))]
    pub async fn reverse(
        &self,
        transaction_id: TransactionId,
    ) -> Result<ReversalReceipt, AppError> {
        // Resolve the accounts first; the lock order depends on them.
        let original = self
            .repo
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(transaction_id.to_string()))?;

        let _guard = self.locks.lock_pair(original.sender, original.receiver).await;

        let mut tx = self.repo.begin().await?;

        // Re-read under the lock: a concurrent reversal may have won the race.
        let Some(original) = Repository::transaction_for_update(&mut tx, transaction_id).await?
        else {
            return Err(AppError::TransactionNotFound(transaction_id.to_string()));
        };

        let sender_balance = Repository::balance_for_update(&mut tx, original.sender)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(original.sender.to_string()))?;
        let receiver_balance = Repository::balance_for_update(&mut tx, original.receiver)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(original.receiver.to_string()))?;

        // The inverse debit must not overdraw the receiver; balances never
        // go negative, reversals included.
        if receiver_balance < original.amount {
            warn!(balance = %receiver_balance, "reversal rejected: receiver balance spent");
            return Err(AppError::InsufficientBalance {
                account: original.receiver,
                balance: receiver_balance,
                required: original.amount,
            });
        }

        let new_sender_balance = sender_balance + original.amount;
        let new_receiver_balance = receiver_balance - original.amount;

        Repository::set_balance(&mut tx, original.sender, new_sender_balance).await?;
        Repository::set_balance(&mut tx, original.receiver, new_receiver_balance).await?;
        Repository::delete_transaction(&mut tx, original.id).await?;

        tx.commit().await.context("Failed to commit reversal")?;

        info!(transaction_id = %original.id, "reversal committed");

        Ok(ReversalReceipt {
            reversed: original,
            sender_balance: new_sender_balance,
            receiver_balance: new_receiver_balance,
        })
    }

    // ========================
    // Query facade
    // ========================

    /// Get a transaction by id.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, AppError> {
        self.repo
            .get_transaction(id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(id.to_string()))
    }

    /// List all transactions in insertion order.
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>, AppError> {
        Ok(self.repo.list_transactions().await?)
    }

    // ========================
    // Integrity operations
    // ========================

    /// Check ledger integrity and return a report.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let stats = self.repo.get_integrity_stats().await?;
        let accounts = self.repo.list_accounts().await?;

        Ok(build_integrity_report(
            &accounts,
            stats.transaction_count,
            stats.dangling_references,
            stats.invalid_amounts,
            stats.has_sequence_gaps,
        ))
    }
}
