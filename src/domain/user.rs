use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Cents;

pub type UserId = Uuid;

/// A registered account holder. Usernames are unique, case-sensitive and
/// immutable; the stored balance is a projection of the user's transaction
/// records and is only ever mutated together with a new record.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Current balance in cents. Always equals sum(deposits) - sum(withdrawals).
    pub balance_cents: Cents,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            balance_cents: 0,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_starts_at_zero() {
        let user = User::new("alice".into());
        assert_eq!(user.username, "alice");
        assert_eq!(user.balance_cents, 0);
    }

    #[test]
    fn test_new_users_get_distinct_ids() {
        let a = User::new("alice".into());
        let b = User::new("bob".into());
        assert_ne!(a.id, b.id);
    }
}
