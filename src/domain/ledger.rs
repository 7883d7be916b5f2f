use super::{Cents, TransactionRecord, format_cents};

/// Compute a user's balance from their transaction records.
/// Balance = sum of deposits - sum of withdrawals
pub fn compute_balance(records: &[TransactionRecord]) -> Cents {
    records
        .iter()
        .fold(0, |balance, record| balance + record.balance_delta())
}

/// A stored balance that disagrees with the balance recomputed from records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceMismatch {
    pub username: String,
    pub stored: Cents,
    pub recomputed: Cents,
}

impl std::fmt::Display for BalanceMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: stored balance {} but records sum to {}",
            self.username,
            format_cents(self.stored),
            format_cents(self.recomputed)
        )
    }
}

/// Result of a full ledger integrity check.
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub user_count: i64,
    pub transaction_count: i64,
    pub has_sequence_gaps: bool,
    pub invalid_amounts: i64,
    pub balance_mismatches: Vec<BalanceMismatch>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        !self.has_sequence_gaps && self.invalid_amounts == 0 && self.balance_mismatches.is_empty()
    }

    /// Human-readable list of problems, empty when the ledger is consistent.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.has_sequence_gaps {
            issues.push("transaction sequence numbers have gaps".to_string());
        }
        if self.invalid_amounts > 0 {
            issues.push(format!(
                "{} transaction record(s) with non-positive amounts",
                self.invalid_amounts
            ));
        }
        for mismatch in &self.balance_mismatches {
            issues.push(mismatch.to_string());
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::super::TransactionKind;
    use super::*;

    fn make_record(user_id: Uuid, amount: Cents, kind: TransactionKind) -> TransactionRecord {
        TransactionRecord::new(user_id, amount, kind)
    }

    #[test]
    fn test_compute_balance_empty() {
        assert_eq!(compute_balance(&[]), 0);
    }

    #[test]
    fn test_compute_balance_deposits_only() {
        let user = Uuid::new_v4();
        let records = vec![
            make_record(user, 5000, TransactionKind::Deposit),
            make_record(user, 2500, TransactionKind::Deposit),
        ];

        assert_eq!(compute_balance(&records), 7500);
    }

    #[test]
    fn test_compute_balance_mixed() {
        let user = Uuid::new_v4();
        let records = vec![
            make_record(user, 10000, TransactionKind::Deposit), // +10000
            make_record(user, 3000, TransactionKind::Withdrawal), // -3000
            make_record(user, 500, TransactionKind::Deposit),   // +500
        ];

        assert_eq!(compute_balance(&records), 7500);
    }

    #[test]
    fn test_integrity_report_clean() {
        let report = IntegrityReport {
            user_count: 3,
            transaction_count: 10,
            has_sequence_gaps: false,
            invalid_amounts: 0,
            balance_mismatches: vec![],
        };

        assert!(report.is_clean());
        assert!(report.issues().is_empty());
    }

    #[test]
    fn test_integrity_report_with_mismatch() {
        let report = IntegrityReport {
            user_count: 1,
            transaction_count: 2,
            has_sequence_gaps: true,
            invalid_amounts: 1,
            balance_mismatches: vec![BalanceMismatch {
                username: "alice".into(),
                stored: 5000,
                recomputed: 4000,
            }],
        };

        assert!(!report.is_clean());
        assert_eq!(report.issues().len(), 3);
    }
}
