//! Pending mutation model

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a queued operation, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OperationId(Uuid);

impl OperationId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of mutation awaiting transmission to the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Register,
    UpdatePassword,
    DeleteUser,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Register => "REGISTER",
            Self::UpdatePassword => "UPDATE_PASSWORD",
            Self::DeleteUser => "DELETE_USER",
        };
        f.write_str(name)
    }
}

/// De-duplication identity of an operation: (kind, username, account)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationKey {
    pub kind: OperationKind,
    pub username: String,
    pub account: Option<String>,
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.kind,
            self.username,
            self.account.as_deref().unwrap_or("null")
        )
    }
}

/// An immutable mutation captured while the remote store was unreachable
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOperation {
    id: OperationId,
    kind: OperationKind,
    username: String,
    account: Option<String>,
    password: Option<String>,
    created_at: i64,
}

impl SyncOperation {
    fn new(
        kind: OperationKind,
        username: &str,
        account: Option<&str>,
        password: Option<&str>,
    ) -> Self {
        Self {
            id: OperationId::new(),
            kind,
            username: username.to_string(),
            account: account.map(str::to_string),
            password: password.map(str::to_string),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    #[must_use]
    pub fn register(username: &str, account: &str, password: &str) -> Self {
        Self::new(
            OperationKind::Register,
            username,
            Some(account),
            Some(password),
        )
    }

    #[must_use]
    pub fn update_password(username: &str, new_password: &str) -> Self {
        Self::new(
            OperationKind::UpdatePassword,
            username,
            None,
            Some(new_password),
        )
    }

    #[must_use]
    pub fn delete_user(username: &str) -> Self {
        Self::new(OperationKind::DeleteUser, username, None, None)
    }

    pub const fn id(&self) -> OperationId {
        self.id
    }

    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub const fn created_at(&self) -> i64 {
        self.created_at
    }

    /// True when `self` was captured after `other`.
    pub fn is_newer_than(&self, other: &Self) -> bool {
        (self.created_at, self.id) > (other.created_at, other.id)
    }

    /// Identity used by the cache and queue for de-duplication.
    #[must_use]
    pub fn key(&self) -> OperationKey {
        OperationKey {
            kind: self.kind,
            username: self.username.clone(),
            account: self.account.clone(),
        }
    }
}

impl fmt::Debug for SyncOperation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SyncOperation")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("username", &self.username)
            .field("account", &self.account)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.username)?;
        if let Some(account) = &self.account {
            write!(f, " ({account})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn key_ignores_password_and_timestamp() {
        let first = SyncOperation::update_password("alice", "p1");
        let second = SyncOperation::update_password("alice", "p2");
        assert_ne!(first.id(), second.id());
        assert_eq!(first.key(), second.key());
    }

    #[test]
    fn later_operations_are_newer() {
        let first = SyncOperation::update_password("alice", "p1");
        let second = SyncOperation::update_password("alice", "p2");
        assert!(second.is_newer_than(&first));
        assert!(!first.is_newer_than(&second));
        assert!(!first.is_newer_than(&first));
    }

    #[test]
    fn key_distinguishes_kind_and_account() {
        let register = SyncOperation::register("alice", "a1", "p1");
        let other_account = SyncOperation::register("alice", "a2", "p1");
        let delete = SyncOperation::delete_user("alice");
        assert_ne!(register.key(), other_account.key());
        assert_ne!(register.key(), delete.key());
    }

    #[test]
    fn key_display_matches_cache_key_format() {
        assert_eq!(
            SyncOperation::register("alice", "a1", "p1").key().to_string(),
            "REGISTER_alice_a1"
        );
        assert_eq!(
            SyncOperation::delete_user("bob").key().to_string(),
            "DELETE_USER_bob_null"
        );
    }

    #[test]
    fn debug_and_display_hide_password() {
        let op = SyncOperation::register("alice", "a1", "hunter2");
        let rendered = format!("{op:?} {op}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REGISTER alice (a1)"));
    }

    #[test]
    fn constructors_set_optional_fields() {
        let op = SyncOperation::delete_user("bob");
        assert_eq!(op.kind(), OperationKind::DeleteUser);
        assert_eq!(op.account(), None);
        assert_eq!(op.password(), None);
        assert!(op.created_at() > 0);
    }
}
