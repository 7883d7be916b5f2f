use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::domain::{Cents, TransactionKind, TransactionRecord, User, UserId};

use super::MIGRATION_001_INITIAL;

/// Statistics for ledger integrity verification.
#[derive(Debug, Clone)]
pub struct IntegrityStats {
    pub user_count: i64,
    pub transaction_count: i64,
    pub has_sequence_gaps: bool,
    pub invalid_amounts: i64,
}

/// Repository for persisting and querying users and transaction records.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    /// WAL mode keeps reads non-blocking while a writer holds the single
    /// write lock; the busy timeout makes concurrent writers queue.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Close the connection pool, waiting for in-flight queries to finish.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========================
    // User operations
    // ========================

    /// Insert a new user row. Returns false when the username is already
    /// taken (unique constraint), leaving the existing user untouched.
    pub async fn insert_user(&self, user: &User) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, username, balance_cents, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(user.balance_cents)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(false),
            Err(e) => Err(e).context("Failed to insert user"),
        }
    }

    /// Get a user by username (case-sensitive exact match).
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, balance_cents, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    /// List all users, ordered by username.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, balance_cents, created_at
            FROM users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users")?;

        rows.iter().map(Self::row_to_user).collect()
    }

    fn row_to_user(row: &SqliteRow) -> Result<User> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(User {
            id: Uuid::parse_str(&id_str).context("Invalid user ID")?,
            username: row.get("username"),
            balance_cents: row.get("balance_cents"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// Apply a deposit: bump the sequence counter, credit the balance and
    /// insert the record, all in one database transaction. Returns the new
    /// balance. Assigns the record's sequence number.
    pub async fn apply_deposit(&self, record: &mut TransactionRecord) -> Result<Cents> {
        debug_assert!(record.kind == TransactionKind::Deposit);

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin deposit transaction")?;

        // First statement is a write, so the transaction takes the write
        // lock before touching any balance.
        record.sequence = Self::next_sequence(&mut tx).await?;

        let row = sqlx::query(
            r#"
            UPDATE users
            SET balance_cents = balance_cents + ?
            WHERE id = ?
            RETURNING balance_cents
            "#,
        )
        .bind(record.amount_cents)
        .bind(record.user_id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to credit balance")?;

        let Some(row) = row else {
            anyhow::bail!("User row missing for id {}", record.user_id);
        };
        let new_balance: Cents = row.get("balance_cents");

        Self::insert_record(&mut tx, record).await?;

        tx.commit()
            .await
            .context("Failed to commit deposit transaction")?;

        Ok(new_balance)
    }

    /// Apply a withdrawal in one database transaction. The balance check is
    /// part of the UPDATE itself, so two concurrent withdrawals can never
    /// both pass it against the same funds. Returns the new balance, or
    /// None (everything rolled back, sequence included) when the balance
    /// is insufficient.
    pub async fn apply_withdrawal(&self, record: &mut TransactionRecord) -> Result<Option<Cents>> {
        debug_assert!(record.kind == TransactionKind::Withdrawal);

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin withdrawal transaction")?;

        record.sequence = Self::next_sequence(&mut tx).await?;

        let row = sqlx::query(
            r#"
            UPDATE users
            SET balance_cents = balance_cents - ?
            WHERE id = ? AND balance_cents >= ?
            RETURNING balance_cents
            "#,
        )
        .bind(record.amount_cents)
        .bind(record.user_id.to_string())
        .bind(record.amount_cents)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to debit balance")?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .context("Failed to roll back withdrawal transaction")?;
            return Ok(None);
        };
        let new_balance: Cents = row.get("balance_cents");

        Self::insert_record(&mut tx, record).await?;

        tx.commit()
            .await
            .context("Failed to commit withdrawal transaction")?;

        Ok(Some(new_balance))
    }

    /// Get the next sequence number and increment the counter.
    /// Runs inside the caller's transaction; a rollback restores the counter.
    async fn next_sequence(tx: &mut Transaction<'_, Sqlite>) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'transaction_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut **tx)
        .await
        .context("Failed to get next sequence number")?;

        Ok(row.get("value"))
    }

    async fn insert_record(
        tx: &mut Transaction<'_, Sqlite>,
        record: &TransactionRecord,
    ) -> Result<()> {
        let sql = match record.kind {
            TransactionKind::Deposit => {
                "INSERT INTO deposits (id, sequence, user_id, amount_cents, date) VALUES (?, ?, ?, ?, ?)"
            }
            TransactionKind::Withdrawal => {
                "INSERT INTO withdrawals (id, sequence, user_id, amount_cents, date) VALUES (?, ?, ?, ?, ?)"
            }
        };

        sqlx::query(sql)
            .bind(record.id.to_string())
            .bind(record.sequence)
            .bind(record.user_id.to_string())
            .bind(record.amount_cents)
            .bind(record.date.to_rfc3339())
            .execute(&mut **tx)
            .await
            .context("Failed to insert transaction record")?;

        Ok(())
    }

    /// List one kind of record for a user, in insertion order.
    pub async fn list_records(
        &self,
        user_id: UserId,
        kind: TransactionKind,
    ) -> Result<Vec<TransactionRecord>> {
        let sql = match kind {
            TransactionKind::Deposit => {
                "SELECT id, sequence, user_id, amount_cents, date FROM deposits WHERE user_id = ? ORDER BY sequence"
            }
            TransactionKind::Withdrawal => {
                "SELECT id, sequence, user_id, amount_cents, date FROM withdrawals WHERE user_id = ? ORDER BY sequence"
            }
        };

        let rows = sqlx::query(sql)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transaction records")?;

        rows.iter()
            .map(|row| Self::row_to_record(row, kind))
            .collect()
    }

    fn row_to_record(row: &SqliteRow, kind: TransactionKind) -> Result<TransactionRecord> {
        let id_str: String = row.get("id");
        let user_id_str: String = row.get("user_id");
        let date_str: String = row.get("date");

        Ok(TransactionRecord {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            sequence: row.get("sequence"),
            user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
            amount_cents: row.get("amount_cents"),
            kind,
            date: DateTime::parse_from_rfc3339(&date_str)
                .context("Invalid date timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Integrity checks
    // ========================

    /// Get statistics for integrity checking.
    pub async fn get_integrity_stats(&self) -> Result<IntegrityStats> {
        let user_count: i64 = sqlx::query("SELECT COUNT(*) as count FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?
            .get("count");

        // Committed sequence numbers are dense; check across both tables.
        let sequence_check = sqlx::query(
            r#"
            SELECT
                MIN(sequence) as min_seq,
                MAX(sequence) as max_seq,
                COUNT(*) as count
            FROM (
                SELECT sequence FROM deposits
                UNION ALL
                SELECT sequence FROM withdrawals
            )
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to check sequence numbers")?;

        let min_seq: Option<i64> = sequence_check.get("min_seq");
        let max_seq: Option<i64> = sequence_check.get("max_seq");
        let transaction_count: i64 = sequence_check.get("count");

        let has_sequence_gaps = match (min_seq, max_seq) {
            (Some(min), Some(max)) => (max - min + 1) != transaction_count,
            _ => false,
        };

        let invalid_amounts: i64 = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM deposits WHERE amount_cents <= 0) +
                (SELECT COUNT(*) FROM withdrawals WHERE amount_cents <= 0) as count
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to check amounts")?
        .get("count");

        Ok(IntegrityStats {
            user_count,
            transaction_count,
            has_sequence_gaps,
            invalid_amounts,
        })
    }
}
