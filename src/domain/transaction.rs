use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AccountId;

pub type TransactionId = Uuid;

/// A transaction is the durable record of a committed balance movement.
/// Its existence proves the debit and credit already happened; there is no
/// pending state. Records are immutable - a reversal deletes the record and
/// restores the two balances it touched, rather than appending a correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Monotonically increasing sequence number for insertion ordering
    pub sequence: i64,
    /// Account that was debited
    pub sender: AccountId,
    /// Account that was credited
    pub receiver: AccountId,
    /// Amount moved (always positive)
    pub amount: Decimal,
    /// Free-text description
    pub details: Option<String>,
    /// When the record was committed
    pub recorded_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction. Sequence number is assigned by the repository.
    pub fn new(sender: AccountId, receiver: AccountId, amount: Decimal) -> Self {
        assert!(amount > Decimal::ZERO, "Transaction amount must be positive");
        assert!(sender != receiver, "Sender and receiver must differ");
        Self {
            id: Uuid::new_v4(),
            sequence: 0, // Will be set by repository
            sender,
            receiver,
            amount,
            details: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn sample_account_ids() -> (AccountId, AccountId) {
        (Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn test_create_transaction() {
        let (sender, receiver) = sample_account_ids();
        let tx = Transaction::new(sender, receiver, dec!(30.00)).with_details("rent");

        assert_eq!(tx.sender, sender);
        assert_eq!(tx.receiver, receiver);
        assert_eq!(tx.amount, dec!(30.00));
        assert_eq!(tx.details, Some("rent".to_string()));
    }

    #[test]
    #[should_panic(expected = "Transaction amount must be positive")]
    fn test_transaction_requires_positive_amount() {
        let (sender, receiver) = sample_account_ids();
        Transaction::new(sender, receiver, dec!(0));
    }

    #[test]
    #[should_panic(expected = "Sender and receiver must differ")]
    fn test_transaction_rejects_self_transfer() {
        let id = Uuid::new_v4();
        Transaction::new(id, id, dec!(1.00));
    }
}
