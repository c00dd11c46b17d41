//! Account and session token records.
//!
//! # Invariants
//! - `Account::id` is generated once and never reused.
//! - A `SessionToken` is bound to exactly one account id at issuance.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for a registered account.
pub type AccountId = Uuid;

/// Registered account. Created on registration and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Unique within the directory, compared case-sensitively.
    pub email: String,
    /// Display name.
    pub name: String,
}

impl Account {
    /// Creates an account with a freshly generated id.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
        }
    }
}

/// Opaque credential proving an authenticated session.
///
/// Tokens do not expire; `issued_at_ms` only keeps values distinct across
/// logins of the same account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub value: String,
    pub account_id: AccountId,
    pub issued_at_ms: i64,
}

impl SessionToken {
    /// Issues a new token bound to `account_id` at the current time.
    pub fn issue(account_id: AccountId) -> Self {
        let issued_at_ms = now_epoch_ms();
        Self {
            value: format!("session-{account_id}-{issued_at_ms}"),
            account_id,
            issued_at_ms,
        }
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
///
/// Clamps to `0` if the system clock reports a time before the epoch.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
