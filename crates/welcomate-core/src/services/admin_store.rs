//! Service-side user store ("B") behind the admin contract.
//!
//! Keeps its own `SQLite` table with a role column. Only password digests are
//! stored, so this store never exports credentials.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::models::{hash_password, SyncRecord};
use crate::remote::{AdminService, RemoteError, RemoteResult};
use crate::util::unix_timestamp_millis;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS admin_users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    account TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'USER' CHECK (role IN ('USER', 'ADMIN')),
    created_at INTEGER NOT NULL
);";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Self::User),
            "ADMIN" => Ok(Self::Admin),
            other => Err(Error::InvalidInput(format!("Unknown role: {other}"))),
        }
    }
}

/// Outcome of an administrator login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminLogin {
    Success(String),
    Failed,
    /// Credentials are valid but the account is not an administrator
    PermissionDenied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser {
    pub username: String,
    pub account: String,
    pub role: Role,
}

#[derive(Clone)]
pub struct AdminStore {
    conn: Arc<Mutex<Connection>>,
}

impl AdminStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self::from_connection(Connection::open(path)?)?;
        tracing::debug!("Opened admin store at {}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert a user with the given role. `false` on duplicate username or account.
    pub fn add_user(&self, username: &str, account: &str, password: &str, role: Role) -> Result<bool> {
        let inserted = self.conn.lock().execute(
            "INSERT OR IGNORE INTO admin_users (username, account, password_hash, role, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                username,
                account,
                hash_password(password),
                role.as_str(),
                unix_timestamp_millis()
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Administrator login: valid credentials alone are not enough.
    pub fn login_admin_role(&self, account: &str, password: &str) -> Result<AdminLogin> {
        let found: Option<(String, String)> = self
            .conn
            .lock()
            .query_row(
                "SELECT username, role FROM admin_users WHERE account = ? AND password_hash = ?",
                params![account, hash_password(password)],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((username, role)) = found else {
            return Ok(AdminLogin::Failed);
        };
        if role.parse::<Role>()? == Role::Admin {
            Ok(AdminLogin::Success(username))
        } else {
            Ok(AdminLogin::PermissionDenied)
        }
    }

    pub fn users(&self) -> Result<Vec<AdminUser>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT username, account, role FROM admin_users ORDER BY id ASC")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(username, account, role)| {
                Ok(AdminUser {
                    username,
                    account,
                    role: role.parse()?,
                })
            })
            .collect()
    }

    fn verify(&self, account: &str, password: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .lock()
            .query_row(
                "SELECT username FROM admin_users WHERE account = ? AND password_hash = ?",
                params![account, hash_password(password)],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn set_password(&self, username: &str, new_password: &str) -> Result<usize> {
        Ok(self.conn.lock().execute(
            "UPDATE admin_users SET password_hash = ? WHERE username = ?",
            params![hash_password(new_password), username],
        )?)
    }

    fn remove(&self, username: &str) -> Result<usize> {
        Ok(self
            .conn
            .lock()
            .execute("DELETE FROM admin_users WHERE username = ?", params![username])?)
    }

    fn has_account(&self, account: &str) -> Result<bool> {
        Ok(self.conn.lock().query_row(
            "SELECT EXISTS(SELECT 1 FROM admin_users WHERE account = ?)",
            params![account],
            |row| row.get::<_, i32>(0).map(|value| value != 0),
        )?)
    }
}

fn internal(error: Error) -> RemoteError {
    RemoteError::Internal(error.to_string())
}

#[async_trait]
impl AdminService for AdminStore {
    async fn login_admin(&self, account: &str, password: &str) -> RemoteResult<Option<String>> {
        self.verify(account, password).map_err(internal)
    }

    async fn register_user(
        &self,
        username: &str,
        account: &str,
        password: &str,
    ) -> RemoteResult<bool> {
        let created = self
            .add_user(username, account, password, Role::User)
            .map_err(internal)?;
        if !created {
            tracing::debug!("Registration rejected, {username} or {account} already exists");
        }
        Ok(created)
    }

    async fn update_user_password(&self, username: &str, new_password: &str) -> RemoteResult<()> {
        let rows = self.set_password(username, new_password).map_err(internal)?;
        if rows == 0 {
            tracing::debug!("Password update for unknown user {username}");
        }
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> RemoteResult<()> {
        self.remove(username).map_err(internal)?;
        Ok(())
    }

    async fn user_exists(&self, account: &str) -> RemoteResult<bool> {
        self.has_account(account).map_err(internal)
    }

    async fn get_local_users(&self) -> RemoteResult<Vec<SyncRecord>> {
        Err(RemoteError::PermissionDenied(
            "service store does not export credentials".to_string(),
        ))
    }

    async fn clear_local_users(&self) -> RemoteResult<()> {
        let removed = self
            .conn
            .lock()
            .execute("DELETE FROM admin_users WHERE role = 'USER'", [])
            .map_err(|error| internal(error.into()))?;
        tracing::info!("Cleared {removed} users from service store");
        Ok(())
    }

    async fn notify_user_registered(&self, username: &str) -> RemoteResult<()> {
        tracing::info!("Client registered user {username}");
        Ok(())
    }

    async fn notify_user_deleted(&self, username: &str) -> RemoteResult<()> {
        tracing::info!("Client deleted user {username}");
        Ok(())
    }

    async fn notify_password_updated(&self, username: &str, _new_password: &str) -> RemoteResult<()> {
        tracing::info!("Client updated password for {username}");
        Ok(())
    }
}
