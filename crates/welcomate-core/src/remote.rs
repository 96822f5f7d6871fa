//! Remote admin service contract.
//!
//! The privileged service ("B") is only reachable through this trait. Every
//! call can fail with a [`RemoteError`]; callers in the sync subsystem turn
//! those faults into data instead of propagating them.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::SyncRecord;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Remote service disconnected")]
    Disconnected,
    #[error("Remote transport error: {0}")]
    Transport(String),
    #[error("Remote call timed out")]
    Timeout,
    #[error("Remote permission denied: {0}")]
    PermissionDenied(String),
    #[error("Remote record not found: {0}")]
    NotFound(String),
    #[error("Remote rejected payload: {0}")]
    InvalidData(String),
    #[error("Remote service error: {0}")]
    Internal(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Admin interface exposed by the remote service.
#[async_trait]
pub trait AdminService: Send + Sync {
    /// Username for valid credentials, `None` otherwise.
    async fn login_admin(&self, account: &str, password: &str) -> RemoteResult<Option<String>>;

    /// `false` when the username or account already exists.
    async fn register_user(&self, username: &str, account: &str, password: &str)
        -> RemoteResult<bool>;

    async fn update_user_password(&self, username: &str, new_password: &str) -> RemoteResult<()>;

    async fn delete_user(&self, username: &str) -> RemoteResult<()>;

    async fn user_exists(&self, account: &str) -> RemoteResult<bool>;

    async fn get_local_users(&self) -> RemoteResult<Vec<SyncRecord>>;

    async fn clear_local_users(&self) -> RemoteResult<()>;

    async fn notify_user_registered(&self, username: &str) -> RemoteResult<()>;

    async fn notify_user_deleted(&self, username: &str) -> RemoteResult<()>;

    async fn notify_password_updated(&self, username: &str, new_password: &str)
        -> RemoteResult<()>;
}
