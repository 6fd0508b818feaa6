use std::io::Read;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::application::LedgerService;
use crate::domain::{parse_amount, Account};

/// One account row from a seed file. Balances arrive as decimal text so
/// they never pass through floating point.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedRecord {
    pub id: String,
    pub name: String,
    pub balance: String,
}

/// Result of a seed operation
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred for a single seed record
#[derive(Debug, Clone)]
pub struct ImportError {
    pub record: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Importer for loading seed accounts into the ledger
pub struct Importer<'a> {
    service: &'a LedgerService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Seed accounts from a JSON array of `{id, name, balance}` objects.
    pub async fn seed_accounts_json<R: Read>(&self, reader: R) -> Result<ImportResult> {
        let records: Vec<SeedRecord> =
            serde_json::from_reader(reader).context("Failed to parse seed JSON")?;
        self.seed(records).await
    }

    /// Seed accounts from CSV with an `id,name,balance` header.
    pub async fn seed_accounts_csv<R: Read>(&self, reader: R) -> Result<ImportResult> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();
        let mut errors = Vec::new();

        for (index, result) in csv_reader.deserialize::<SeedRecord>().enumerate() {
            let record_num = index + 2; // +2 for header and 0-indexing
            match result {
                Ok(record) => records.push(record),
                Err(e) => errors.push(ImportError {
                    record: record_num,
                    field: None,
                    error: format!("CSV parse error: {}", e),
                }),
            }
        }

        let mut result = self.seed(records).await?;
        result.errors.extend(errors);
        Ok(result)
    }

    /// Validate records one by one, then insert the valid ones through a
    /// single atomic unit of work. Existing ids count as skipped.
    async fn seed(&self, records: Vec<SeedRecord>) -> Result<ImportResult> {
        let mut accounts = Vec::new();
        let mut errors = Vec::new();

        for (index, record) in records.into_iter().enumerate() {
            let record_num = index + 1;

            let id = match Uuid::parse_str(record.id.trim()) {
                Ok(id) => id,
                Err(e) => {
                    errors.push(ImportError {
                        record: record_num,
                        field: Some("id".to_string()),
                        error: format!("Invalid account id: {}", e),
                    });
                    continue;
                }
            };

            let balance = match parse_amount(&record.balance) {
                Ok(balance) if balance >= Decimal::ZERO => balance,
                Ok(_) => {
                    errors.push(ImportError {
                        record: record_num,
                        field: Some("balance".to_string()),
                        error: "Opening balance must not be negative".to_string(),
                    });
                    continue;
                }
                Err(e) => {
                    errors.push(ImportError {
                        record: record_num,
                        field: Some("balance".to_string()),
                        error: format!("Invalid balance: {}", e),
                    });
                    continue;
                }
            };

            accounts.push(Account::new(record.name, balance).with_id(id));
        }

        let outcome = self.service.seed_accounts(accounts).await?;

        Ok(ImportResult {
            imported: outcome.inserted,
            skipped: outcome.skipped,
            errors,
        })
    }
}
