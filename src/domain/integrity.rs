use rust_decimal::Decimal;

use super::{Account, AccountId};

/// Snapshot of ledger health. The total balance is the conservation
/// witness: committed transfers and reversals move value between accounts
/// without changing the sum.
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub account_count: i64,
    pub transaction_count: i64,
    /// Sum of all account balances
    pub total_balance: Decimal,
    /// Accounts whose balance dropped below zero (must be empty)
    pub negative_balances: Vec<(AccountId, Decimal)>,
    /// Transactions referencing a sender or receiver that does not exist
    pub dangling_references: i64,
    /// Transactions with a non-positive amount
    pub invalid_amounts: i64,
    /// Gaps in the insertion-order sequence (reversals legitimately
    /// create gaps, so this is informational, not a failure)
    pub has_sequence_gaps: bool,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.negative_balances.is_empty()
            && self.dangling_references == 0
            && self.invalid_amounts == 0
    }
}

/// Assemble a report from the accounts and the repository's raw counts.
pub fn build_integrity_report(
    accounts: &[Account],
    transaction_count: i64,
    dangling_references: i64,
    invalid_amounts: i64,
    has_sequence_gaps: bool,
) -> IntegrityReport {
    let total_balance = accounts.iter().map(|a| a.balance).sum();
    let negative_balances = accounts
        .iter()
        .filter(|a| a.balance < Decimal::ZERO)
        .map(|a| (a.id, a.balance))
        .collect();

    IntegrityReport {
        account_count: accounts.len() as i64,
        transaction_count,
        total_balance,
        negative_balances,
        dangling_references,
        invalid_amounts,
        has_sequence_gaps,
    }
}
