// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use saldo::application::LedgerService;
use saldo::domain::AccountId;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Test fixture: the standard three accounts
pub struct StandardAccounts {
    pub alice: AccountId,
    pub bob: AccountId,
    pub carol: AccountId,
}

impl StandardAccounts {
    /// Alice 100.00, Bob 50.00, Carol 0.00
    pub async fn create(service: &LedgerService) -> Result<Self> {
        let alice = service.create_account("Alice".into(), dec!(100.00)).await?;
        let bob = service.create_account("Bob".into(), dec!(50.00)).await?;
        let carol = service.create_account("Carol".into(), dec!(0.00)).await?;
        Ok(Self {
            alice: alice.id,
            bob: bob.id,
            carol: carol.id,
        })
    }
}

/// Sum of all account balances (the conservation witness)
pub async fn total_balance(service: &LedgerService) -> Result<Decimal> {
    let accounts = service.list_accounts().await?;
    Ok(accounts.iter().map(|a| a.balance).sum())
}
