//! Fail-closed local user store shared across the sync subsystem.
//!
//! Every operation absorbs database faults: the fault is logged and the
//! caller sees `false`, `None` or an empty list.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::db::{Database, SqliteUserRepository, UserRepository};
use crate::models::{SyncRecord, UserRecord};
use crate::Result;

/// Thread-safe handle to the local user database ("A").
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
}

impl LocalStore {
    /// Open the store at the given filesystem path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_database(Database::open(path)?))
    }

    /// Open an in-memory store (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    pub fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    fn with_repo<T>(&self, f: impl FnOnce(&SqliteUserRepository<'_>) -> Result<T>) -> Result<T> {
        let db = self.db.lock();
        let repo = SqliteUserRepository::new(db.connection());
        f(&repo)
    }

    /// Create an unsynced user. False on duplicate username/account.
    pub fn register(&self, username: &str, account: &str, password: &str) -> bool {
        match self.with_repo(|repo| repo.create(username, account, password)) {
            Ok(_) => {
                tracing::debug!("User registered locally: {username}");
                true
            }
            Err(error) => {
                tracing::warn!("Local registration failed for {username}: {error}");
                false
            }
        }
    }

    /// Verify credentials against the stored digest.
    pub fn login(&self, account: &str, password: &str) -> Option<String> {
        self.with_repo(|repo| repo.verify(account, password))
            .unwrap_or_else(|error| {
                tracing::warn!("Local login failed for account {account}: {error}");
                None
            })
    }

    /// Replace the password and clear the synced flag.
    pub fn update_password(&self, username: &str, new_password: &str) -> bool {
        self.absorb("update password", username, |repo| {
            repo.update_password(username, new_password)
        })
    }

    pub fn delete(&self, username: &str) -> bool {
        self.absorb("delete", username, |repo| repo.delete(username))
    }

    pub fn delete_by_account(&self, account: &str) -> bool {
        self.absorb("delete by account", account, |repo| {
            repo.delete_by_account(account)
        })
    }

    pub fn mark_synced(&self, username: &str) -> bool {
        self.absorb("mark synced", username, |repo| repo.mark_synced(username))
    }

    pub fn unsynced_records(&self) -> Vec<UserRecord> {
        self.with_repo(|repo| repo.list_unsynced())
            .unwrap_or_else(|error| {
                tracing::warn!("Failed to list unsynced users: {error}");
                Vec::new()
            })
    }

    /// All records as credential triples for bulk sync.
    pub fn all_records_for_sync(&self) -> Vec<SyncRecord> {
        self.list().iter().map(UserRecord::to_sync_record).collect()
    }

    pub fn list(&self) -> Vec<UserRecord> {
        self.with_repo(|repo| repo.list()).unwrap_or_else(|error| {
            tracing::warn!("Failed to list users: {error}");
            Vec::new()
        })
    }

    pub fn get(&self, username: &str) -> Option<UserRecord> {
        self.with_repo(|repo| repo.get(username))
            .unwrap_or_else(|error| {
                tracing::warn!("Failed to load user {username}: {error}");
                None
            })
    }

    /// Whether a user with this account exists locally.
    pub fn exists(&self, account: &str) -> bool {
        self.with_repo(|repo| repo.get_by_account(account))
            .map(|user| user.is_some())
            .unwrap_or_else(|error| {
                tracing::warn!("Failed to check account {account}: {error}");
                false
            })
    }

    pub fn clear_all(&self) -> bool {
        match self.with_repo(|repo| repo.clear()) {
            Ok(count) => {
                tracing::info!("Cleared {count} users from local database");
                true
            }
            Err(error) => {
                tracing::warn!("Failed to clear local users: {error}");
                false
            }
        }
    }

    fn absorb(
        &self,
        action: &str,
        subject: &str,
        f: impl FnOnce(&SqliteUserRepository<'_>) -> Result<()>,
    ) -> bool {
        match self.with_repo(f) {
            Ok(()) => {
                tracing::debug!("Local {action} succeeded for {subject}");
                true
            }
            Err(error) => {
                tracing::warn!("Local {action} failed for {subject}: {error}");
                false
            }
        }
    }
}
