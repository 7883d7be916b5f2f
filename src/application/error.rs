use thiserror::Error;

use crate::domain::{Cents, format_cents};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("User already exists: {0}")]
    DuplicateUser(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error(
        "Insufficient balance for {username}: balance is {}, requested {}",
        fmt_cents(.balance),
        fmt_cents(.requested)
    )]
    InsufficientBalance {
        username: String,
        balance: Cents,
        requested: Cents,
    },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] anyhow::Error),
}

fn fmt_cents(cents: &Cents) -> String {
    format_cents(*cents)
}
