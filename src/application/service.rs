use crate::domain::{
    BalanceMismatch, Cents, IntegrityReport, TransactionKind, TransactionRecord, User,
    cents_from_amount, compute_balance,
};
use crate::storage::Repository;

use super::LedgerError;

/// Application service providing high-level operations for the ledger.
/// This is the primary interface for any client (HTTP API, CLI, tests).
pub struct LedgerService {
    repo: Repository,
}

/// Result of applying a transaction
#[derive(Debug)]
pub struct TransactionResult {
    pub record: TransactionRecord,
    pub new_balance: Cents,
}

/// A user's full transaction history, split by kind
#[derive(Debug)]
pub struct UserHistory {
    pub deposits: Vec<TransactionRecord>,
    pub withdrawals: Vec<TransactionRecord>,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a database at the given path (created if missing).
    pub async fn init(database_path: &str) -> Result<Self, LedgerError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, LedgerError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Close the underlying connection pool.
    pub async fn close(&self) {
        self.repo.close().await;
    }

    // ========================
    // User operations
    // ========================

    /// Register a new user with balance 0.
    pub async fn register_user(&self, username: &str) -> Result<User, LedgerError> {
        if username.is_empty() {
            return Err(LedgerError::InvalidInput(
                "Username must not be empty".to_string(),
            ));
        }

        let user = User::new(username.to_string());
        if self.repo.insert_user(&user).await? {
            Ok(user)
        } else {
            Err(LedgerError::DuplicateUser(username.to_string()))
        }
    }

    /// Get a user by username.
    pub async fn get_user(&self, username: &str) -> Result<User, LedgerError> {
        self.repo
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(username.to_string()))
    }

    /// Get a user's current balance in cents.
    pub async fn balance(&self, username: &str) -> Result<Cents, LedgerError> {
        Ok(self.get_user(username).await?.balance_cents)
    }

    // ========================
    // Transaction operations
    // ========================

    /// Apply a deposit or withdrawal: validate the amount, then atomically
    /// update the balance and append the record.
    pub async fn record_transaction(
        &self,
        username: &str,
        amount: f64,
        kind: TransactionKind,
    ) -> Result<TransactionResult, LedgerError> {
        let amount_cents =
            cents_from_amount(amount).map_err(|e| LedgerError::InvalidInput(e.to_string()))?;

        let user = self.get_user(username).await?;

        let mut record = TransactionRecord::new(user.id, amount_cents, kind);
        let new_balance = match kind {
            TransactionKind::Deposit => self.repo.apply_deposit(&mut record).await?,
            TransactionKind::Withdrawal => {
                match self.repo.apply_withdrawal(&mut record).await? {
                    Some(balance) => balance,
                    None => {
                        // Re-read for the error message; users are never deleted.
                        let balance = self.balance(username).await?;
                        return Err(LedgerError::InsufficientBalance {
                            username: username.to_string(),
                            balance,
                            requested: amount_cents,
                        });
                    }
                }
            }
        };

        Ok(TransactionResult {
            record,
            new_balance,
        })
    }

    /// Get a user's history: deposits and withdrawals in insertion order.
    pub async fn history(&self, username: &str) -> Result<UserHistory, LedgerError> {
        let user = self.get_user(username).await?;

        let deposits = self
            .repo
            .list_records(user.id, TransactionKind::Deposit)
            .await?;
        let withdrawals = self
            .repo
            .list_records(user.id, TransactionKind::Withdrawal)
            .await?;

        Ok(UserHistory {
            deposits,
            withdrawals,
        })
    }

    // ========================
    // Integrity checks
    // ========================

    /// Verify that every stored balance matches the balance recomputed from
    /// that user's records, and that the record set itself is well-formed.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, LedgerError> {
        let stats = self.repo.get_integrity_stats().await?;
        let users = self.repo.list_users().await?;

        let mut balance_mismatches = Vec::new();
        for user in &users {
            let mut records = self
                .repo
                .list_records(user.id, TransactionKind::Deposit)
                .await?;
            records.extend(
                self.repo
                    .list_records(user.id, TransactionKind::Withdrawal)
                    .await?,
            );

            let recomputed = compute_balance(&records);
            if recomputed != user.balance_cents {
                balance_mismatches.push(BalanceMismatch {
                    username: user.username.clone(),
                    stored: user.balance_cents,
                    recomputed,
                });
            }
        }

        Ok(IntegrityReport {
            user_count: stats.user_count,
            transaction_count: stats.transaction_count,
            has_sequence_gaps: stats.has_sequence_gaps,
            invalid_amounts: stats.invalid_amounts,
            balance_mismatches,
        })
    }
}
