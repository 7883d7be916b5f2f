mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{register_funded, test_service};
use tokio::sync::Barrier;
use vestup::application::LedgerError;
use vestup::domain::TransactionKind;

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_withdrawals_never_overdraw() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = Arc::new(service);

    // Balance covers exactly 4 of the 8 identical withdrawals
    register_funded(&service, "alice", 40.0).await?;

    let barrier = Arc::new(Barrier::new(8));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            service
                .record_transaction("alice", 10.0, TransactionKind::Withdrawal)
                .await
        }));
    }

    let mut ok = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => ok += 1,
            Err(LedgerError::InsufficientBalance { .. }) => insufficient += 1,
            Err(e) => anyhow::bail!("unexpected error: {}", e),
        }
    }

    assert_eq!(ok, 4);
    assert_eq!(insufficient, 4);
    assert_eq!(service.balance("alice").await?, 0);

    let history = service.history("alice").await?;
    assert_eq!(history.withdrawals.len(), 4);

    // Rolled-back attempts leave no trace in the committed sequence
    let report = service.check_integrity().await?;
    assert!(!report.has_sequence_gaps);
    assert!(report.is_clean());

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_registrations_single_winner() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = Arc::new(service);

    let barrier = Arc::new(Barrier::new(8));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            service.register_user("alice").await
        }));
    }

    let mut ok = 0;
    let mut duplicate = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => ok += 1,
            Err(LedgerError::DuplicateUser(_)) => duplicate += 1,
            Err(e) => anyhow::bail!("unexpected error: {}", e),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(duplicate, 7);
    assert_eq!(service.balance("alice").await?, 0);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_deposits_all_commit() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = Arc::new(service);
    service.register_user("alice").await?;

    let barrier = Arc::new(Barrier::new(8));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            service
                .record_transaction("alice", 12.5, TransactionKind::Deposit)
                .await
        }));
    }

    for handle in handles {
        handle.await??;
    }

    assert_eq!(service.balance("alice").await?, 10000);

    let history = service.history("alice").await?;
    assert_eq!(history.deposits.len(), 8);

    // Fresh database: the 8 commits take sequences 1 through 8
    let mut sequences: Vec<i64> = history.deposits.iter().map(|r| r.sequence).collect();
    sequences.sort_unstable();
    assert_eq!(sequences, (1..=8).collect::<Vec<i64>>());

    let report = service.check_integrity().await?;
    assert!(report.is_clean());

    Ok(())
}
