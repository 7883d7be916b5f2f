use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Cents, UserId};

pub type TransactionId = Uuid;

/// Which side of the ledger a record belongs to. Deposits and withdrawals
/// are stored in separate tables, so the kind picks the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Money entering the user's balance
    Deposit,
    /// Money leaving the user's balance
    Withdrawal,
}

/// A single committed balance change. Records are immutable once committed
/// and are never deleted - the ledger is append-only.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub id: TransactionId,
    /// Monotonically increasing sequence number for ordering
    pub sequence: i64,
    /// Owner of this record (users are never deleted)
    pub user_id: UserId,
    /// Amount in cents (always positive)
    pub amount_cents: Cents,
    pub kind: TransactionKind,
    /// Wall-clock time the record was created
    pub date: DateTime<Utc>,
}

impl TransactionRecord {
    /// Create a new record. Sequence number must be assigned by the repository.
    pub fn new(user_id: UserId, amount_cents: Cents, kind: TransactionKind) -> Self {
        assert!(amount_cents > 0, "Transaction amount must be positive");
        Self {
            id: Uuid::new_v4(),
            sequence: 0, // Will be set by repository
            user_id,
            amount_cents,
            kind,
            date: Utc::now(),
        }
    }

    /// Signed effect of this record on the owner's balance.
    pub fn balance_delta(&self) -> Cents {
        match self.kind {
            TransactionKind::Deposit => self.amount_cents,
            TransactionKind::Withdrawal => -self.amount_cents,
        }
    }
}
