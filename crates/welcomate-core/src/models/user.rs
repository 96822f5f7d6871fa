//! User record model

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::Result;

/// A user row in the local store
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Row identifier
    pub id: i64,
    /// Unique display name
    pub username: String,
    /// Unique login account
    pub account: String,
    /// SHA-256 hex digest of the password
    pub password_hash: String,
    /// Plaintext password kept so the record can be re-registered remotely
    pub password_plaintext: String,
    /// Whether the remote store has seen the current version of this record
    pub synced: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl UserRecord {
    /// The credential triple pushed to the remote store
    #[must_use]
    pub fn to_sync_record(&self) -> SyncRecord {
        SyncRecord {
            username: self.username.clone(),
            account: self.account.clone(),
            password: self.password_plaintext.clone(),
        }
    }
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("account", &self.account)
            .field("password_hash", &"[REDACTED]")
            .field("password_plaintext", &"[REDACTED]")
            .field("synced", &self.synced)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Credential triple exchanged during bulk sync
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub username: String,
    pub account: String,
    pub password: String,
}

impl fmt::Debug for SyncRecord {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SyncRecord")
            .field("username", &self.username)
            .field("account", &self.account)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Encode sync records as a JSON array payload.
pub fn encode_records(records: &[SyncRecord]) -> Result<String> {
    Ok(serde_json::to_string(records)?)
}

/// Decode a JSON array payload produced by [`encode_records`].
pub fn decode_records(payload: &str) -> Result<Vec<SyncRecord>> {
    Ok(serde_json::from_str(payload)?)
}

/// One-way digest used for password verification.
///
/// # Examples
///
/// ```
/// use welcomate_core::models::hash_password;
///
/// let digest = hash_password("secret");
/// assert_eq!(digest.len(), 64);
/// assert_eq!(digest, hash_password("secret"));
/// ```
#[must_use]
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(username: &str, account: &str, password: &str) -> SyncRecord {
        SyncRecord {
            username: username.to_string(),
            account: account.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn hash_password_is_stable_hex_digest() {
        assert_eq!(
            hash_password("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(hash_password("abc"), hash_password("abd"));
    }

    #[test]
    fn records_with_pipes_survive_encoding() {
        let records = vec![record("a|b", "acc|1", "p|w|d"), record("plain", "acc2", "pw")];
        let payload = encode_records(&records).unwrap();
        let decoded = decode_records(&payload).unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn decode_records_rejects_malformed_payload() {
        assert!(decode_records("alice|a1|p1").is_err());
    }

    #[test]
    fn debug_redacts_passwords() {
        let user = UserRecord {
            id: 1,
            username: "alice".to_string(),
            account: "a1".to_string(),
            password_hash: hash_password("hunter2"),
            password_plaintext: "hunter2".to_string(),
            synced: false,
            created_at: 0,
            updated_at: 0,
        };
        let debug = format!("{user:?} {:?}", user.to_sync_record());
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
