// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use tempfile::TempDir;
use vestup::application::LedgerService;
use vestup::domain::TransactionKind;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to register a user and deposit an opening amount
pub async fn register_funded(service: &LedgerService, username: &str, amount: f64) -> Result<()> {
    service.register_user(username).await?;
    service
        .record_transaction(username, amount, TransactionKind::Deposit)
        .await?;
    Ok(())
}
