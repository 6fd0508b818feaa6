use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AccountId = Uuid;

/// An account holding a current balance.
/// Balances are mutated only by the ledger engine's transfer and reversal
/// operations; accounts are created at seed time and never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    /// Current balance. Never negative between committed operations.
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(name: impl Into<String>, opening_balance: Decimal) -> Self {
        assert!(
            opening_balance >= Decimal::ZERO,
            "Opening balance must not be negative"
        );
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            balance: opening_balance,
            created_at: Utc::now(),
        }
    }

    /// Use a caller-supplied id instead of a generated one.
    /// Seed files carry their own stable account ids.
    pub fn with_id(mut self, id: AccountId) -> Self {
        self.id = id;
        self
    }
}
