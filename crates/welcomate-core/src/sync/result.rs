//! Classified outcome of a sync attempt

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::remote::RemoteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncResult {
    Success,
    Failed,
    ClientUnavailable,
    ServerUnavailable,
    AlreadyExists,
    NotFound,
    NetworkError,
    Timeout,
    PermissionDenied,
    InvalidData,
    CacheHit,
}

impl SyncResult {
    pub const fn message(self) -> &'static str {
        match self {
            Self::Success => "operation succeeded",
            Self::Failed => "operation failed",
            Self::ClientUnavailable => "client unavailable",
            Self::ServerUnavailable => "server unavailable",
            Self::AlreadyExists => "record already exists",
            Self::NotFound => "record not found",
            Self::NetworkError => "network error",
            Self::Timeout => "connection timed out",
            Self::PermissionDenied => "permission denied",
            Self::InvalidData => "invalid data",
            Self::CacheHit => "cache hit, sync skipped",
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::CacheHit)
    }

    /// Transient outcomes that put the operation back in the queue.
    pub const fn should_retry(self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::Timeout | Self::ServerUnavailable
        )
    }
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl From<&RemoteError> for SyncResult {
    fn from(error: &RemoteError) -> Self {
        match error {
            RemoteError::Disconnected => Self::ServerUnavailable,
            RemoteError::Transport(_) => Self::NetworkError,
            RemoteError::Timeout => Self::Timeout,
            RemoteError::PermissionDenied(_) => Self::PermissionDenied,
            RemoteError::NotFound(_) => Self::NotFound,
            RemoteError::InvalidData(_) => Self::InvalidData,
            RemoteError::Internal(_) => Self::Failed,
        }
    }
}
