use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::AccountId;
use crate::storage::InsertTransactionError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Sender and receiver must be different accounts")]
    SelfTransfer,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Insufficient balance in account {account}: balance {balance}, required {required}")]
    InsufficientBalance {
        account: AccountId,
        balance: Decimal,
        required: Decimal,
    },

    #[error("Duplicate transaction id: {0}")]
    DuplicateTransaction(String),

    #[error("Transaction references an unknown account")]
    ReferentialIntegrity,

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<InsertTransactionError> for AppError {
    fn from(err: InsertTransactionError) -> Self {
        match err {
            InsertTransactionError::DuplicateId(id) => AppError::DuplicateTransaction(id.to_string()),
            InsertTransactionError::ForeignKeyViolation => AppError::ReferentialIntegrity,
            InsertTransactionError::Storage(err) => AppError::Storage(err),
        }
    }
}
