use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Account, AccountId, Transaction, TransactionId};

use super::MIGRATION_001_INITIAL;

/// Raw counts backing the integrity report.
#[derive(Debug, Clone)]
pub struct IntegrityStats {
    pub transaction_count: i64,
    pub dangling_references: i64,
    pub invalid_amounts: i64,
    pub has_sequence_gaps: bool,
}

/// How a transaction-record insert failed. Constraint violations are
/// surfaced distinctly so callers can tell "bad id" from "storage broken".
#[derive(Debug, Error)]
pub enum InsertTransactionError {
    #[error("duplicate transaction id: {0}")]
    DuplicateId(TransactionId),

    #[error("transaction references an unknown account")]
    ForeignKeyViolation,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Repository for persisting and querying accounts and transactions.
///
/// Reads and writes that must be atomic take an explicit
/// `&mut SqliteConnection` so they compose into a single sqlx transaction;
/// the facade reads run against the pool directly.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the SQLite database at the given path.
    ///
    /// Foreign keys are enforced on every connection, WAL mode lets
    /// facade reads proceed while a transfer commits, and the busy
    /// timeout makes concurrent writers queue instead of failing.
    pub async fn connect(database_path: &str) -> Result<Self> {
        Self::open(database_path, false).await
    }

    /// Initialize a new database (create + migrate).
    pub async fn init(database_path: &str) -> Result<Self> {
        let repo = Self::open(database_path, true).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    async fn open(database_path: &str, create_if_missing: bool) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(create_if_missing)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        // SQLite allows a single writer. One pooled connection makes
        // concurrent units of work queue at checkout instead of failing
        // with SQLITE_BUSY mid-transaction; the busy timeout still covers
        // other processes holding the file.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Begin an atomic unit of work. Dropping the returned transaction
    /// without committing rolls back everything done through it.
    pub async fn begin(&self) -> Result<sqlx::Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .context("Failed to begin unit of work")
    }

    // ========================
    // Account operations
    // ========================

    /// Insert a new account within a unit of work.
    pub async fn insert_account(conn: &mut SqliteConnection, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, balance, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.name)
        .bind(account.balance.to_string())
        .bind(account.created_at.to_rfc3339())
        .execute(&mut *conn)
        .await
        .context("Failed to insert account")?;
        Ok(())
    }

    /// Read an account's balance within a unit of work.
    pub async fn balance_for_update(
        conn: &mut SqliteConnection,
        id: AccountId,
    ) -> Result<Option<Decimal>> {
        let row = sqlx::query("SELECT balance FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await
            .context("Failed to fetch balance")?;

        row.map(|row| parse_balance(&row.get::<String, _>("balance")))
            .transpose()
    }

    /// Write an account's balance within a unit of work.
    /// Returns false if the account does not exist.
    pub async fn set_balance(
        conn: &mut SqliteConnection,
        id: AccountId,
        balance: Decimal,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE accounts SET balance = ? WHERE id = ?")
            .bind(balance.to_string())
            .bind(id.to_string())
            .execute(&mut *conn)
            .await
            .context("Failed to update balance")?;

        Ok(result.rows_affected() > 0)
    }

    /// Get an account by id.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, balance, created_at
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Some(row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// List all accounts in creation order.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, balance, created_at
            FROM accounts
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(row_to_account).collect()
    }

    // ========================
    // Transaction log operations
    // ========================

    /// Append a transaction record within a unit of work.
    /// Assigns the next sequence number before inserting.
    pub async fn insert_transaction(
        conn: &mut SqliteConnection,
        transaction: &mut Transaction,
    ) -> Result<(), InsertTransactionError> {
        transaction.sequence = Self::next_sequence(conn).await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (id, sequence, sender_id, receiver_id, amount, details, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transaction.id.to_string())
        .bind(transaction.sequence)
        .bind(transaction.sender.to_string())
        .bind(transaction.receiver.to_string())
        .bind(transaction.amount.to_string())
        .bind(&transaction.details)
        .bind(transaction.recorded_at.to_rfc3339())
        .execute(&mut *conn)
        .await
        .map_err(|err| translate_constraint_violation(err, transaction.id))?;

        Ok(())
    }

    /// Get the next sequence number and increment the counter.
    async fn next_sequence(conn: &mut SqliteConnection) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'transaction_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut *conn)
        .await
        .context("Failed to get next sequence number")?;

        Ok(row.get("value"))
    }

    /// Look up a transaction within a unit of work.
    pub async fn transaction_for_update(
        conn: &mut SqliteConnection,
        id: TransactionId,
    ) -> Result<Option<Transaction>> {
        let row = sqlx::query(
            r#"
            SELECT id, sequence, sender_id, receiver_id, amount, details, recorded_at
            FROM transactions
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch transaction")?;

        match row {
            Some(row) => Ok(Some(row_to_transaction(&row)?)),
            None => Ok(None),
        }
    }

    /// Delete a transaction record within a unit of work.
    /// Returns false if no record with that id exists.
    pub async fn delete_transaction(
        conn: &mut SqliteConnection,
        id: TransactionId,
    ) -> Result<bool> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *conn)
            .await
            .context("Failed to delete transaction")?;

        Ok(result.rows_affected() > 0)
    }

    /// Get a transaction by id.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query(
            r#"
            SELECT id, sequence, sender_id, receiver_id, amount, details, recorded_at
            FROM transactions
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction")?;

        match row {
            Some(row) => Ok(Some(row_to_transaction(&row)?)),
            None => Ok(None),
        }
    }

    /// List all transactions in insertion order.
    /// Each call is a fresh query reflecting current state.
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, sequence, sender_id, receiver_id, amount, details, recorded_at
            FROM transactions
            ORDER BY sequence
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(row_to_transaction).collect()
    }

    // ========================
    // Integrity checks
    // ========================

    /// Get statistics for integrity checking.
    pub async fn get_integrity_stats(&self) -> Result<IntegrityStats> {
        let transaction_count: i64 = sqlx::query("SELECT COUNT(*) as count FROM transactions")
            .fetch_one(&self.pool)
            .await?
            .get("count");

        let dangling_references: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM transactions t
            WHERE NOT EXISTS (SELECT 1 FROM accounts a WHERE a.id = t.sender_id)
               OR NOT EXISTS (SELECT 1 FROM accounts a WHERE a.id = t.receiver_id)
            "#,
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        let invalid_amounts: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM transactions
            WHERE CAST(amount AS REAL) <= 0
            "#,
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        let sequence_check = sqlx::query(
            r#"
            SELECT
                MIN(sequence) as min_seq,
                MAX(sequence) as max_seq,
                COUNT(*) as count
            FROM transactions
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let min_seq: Option<i64> = sequence_check.get("min_seq");
        let max_seq: Option<i64> = sequence_check.get("max_seq");
        let count: i64 = sequence_check.get("count");

        let has_sequence_gaps = match (min_seq, max_seq) {
            (Some(min), Some(max)) => (max - min + 1) != count,
            _ => false,
        };

        Ok(IntegrityStats {
            transaction_count,
            dangling_references,
            invalid_amounts,
            has_sequence_gaps,
        })
    }
}

fn parse_balance(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).with_context(|| format!("Invalid stored balance: {raw}"))
}

fn row_to_account(row: &SqliteRow) -> Result<Account> {
    let id_str: String = row.get("id");
    let balance_str: String = row.get("balance");
    let created_at_str: String = row.get("created_at");

    Ok(Account {
        id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
        name: row.get("name"),
        balance: parse_balance(&balance_str)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .context("Invalid created_at timestamp")?
            .with_timezone(&Utc),
    })
}

fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
    let id_str: String = row.get("id");
    let sender_str: String = row.get("sender_id");
    let receiver_str: String = row.get("receiver_id");
    let amount_str: String = row.get("amount");
    let recorded_at_str: String = row.get("recorded_at");

    Ok(Transaction {
        id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
        sequence: row.get("sequence"),
        sender: Uuid::parse_str(&sender_str).context("Invalid sender ID")?,
        receiver: Uuid::parse_str(&receiver_str).context("Invalid receiver ID")?,
        amount: Decimal::from_str(&amount_str)
            .with_context(|| format!("Invalid stored amount: {amount_str}"))?,
        details: row.get("details"),
        recorded_at: DateTime::parse_from_rfc3339(&recorded_at_str)
            .context("Invalid recorded_at timestamp")?
            .with_timezone(&Utc),
    })
}

fn translate_constraint_violation(
    err: sqlx::Error,
    id: TransactionId,
) -> InsertTransactionError {
    if let sqlx::Error::Database(db_err) = &err {
        let message = db_err.message();
        if message.contains("UNIQUE constraint failed") {
            return InsertTransactionError::DuplicateId(id);
        }
        if message.contains("FOREIGN KEY constraint failed") {
            return InsertTransactionError::ForeignKeyViolation;
        }
    }
    InsertTransactionError::Storage(
        anyhow::Error::new(err).context("Failed to insert transaction"),
    )
}
