//! Time-windowed operation cache.
//!
//! Maps an operation's de-duplication key to the last observed outcome so
//! that equivalent operations are not sent twice inside the cache window.
//! A success only covers operations carrying the same password as the one
//! that was sent. Expiry is lazy: an entry older than the window is evicted
//! on lookup.

use std::time::Duration;

use dashmap::DashMap;

use super::operation::{OperationKey, OperationKind, SyncOperation};
use super::result::SyncResult;
use crate::config::SyncConfig;
use crate::models::hash_password;
use crate::util::unix_timestamp_millis;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// When the outcome was recorded (Unix ms)
    pub timestamp: i64,
    pub result: SyncResult,
    /// Digest of the password carried by the recorded operation
    pub payload: Option<String>,
}

pub struct OperationCache {
    entries: DashMap<OperationKey, CacheEntry>,
    window_ms: i64,
    enabled: bool,
    verbose: bool,
}

impl OperationCache {
    pub fn new(window: Duration, enabled: bool) -> Self {
        Self {
            entries: DashMap::new(),
            window_ms: i64::try_from(window.as_millis()).unwrap_or(i64::MAX),
            enabled,
            verbose: false,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            verbose: config.debug_logging,
            ..Self::new(config.cache_window(), config.cache_enabled)
        }
    }

    /// True when a non-expired outcome exists for the operation's key.
    pub fn is_cached(&self, operation: &SyncOperation) -> bool {
        self.lookup_at(operation, unix_timestamp_millis()).is_some()
    }

    /// True when a non-expired *successful* outcome exists for the key and
    /// was recorded for the same password.
    pub fn has_success(&self, operation: &SyncOperation) -> bool {
        self.lookup_at(operation, unix_timestamp_millis())
            .is_some_and(|entry| {
                entry.result.is_success() && entry.payload == payload_digest(operation)
            })
    }

    pub fn record(&self, operation: &SyncOperation, result: SyncResult) {
        self.record_at(operation, result, unix_timestamp_millis());
    }

    /// Drop every entry of the given kind.
    pub fn invalidate(&self, kind: OperationKind) {
        self.entries.retain(|key, _| key.kind != kind);
        if self.verbose {
            tracing::debug!("Cleared cache for operation kind {kind}");
        }
    }

    /// Drop the entry for a single operation key.
    pub fn forget(&self, operation: &SyncOperation) {
        self.entries.remove(&operation.key());
    }

    pub fn clear(&self) {
        self.entries.clear();
        if self.verbose {
            tracing::debug!("Cleared all sync cache entries");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn record_at(&self, operation: &SyncOperation, result: SyncResult, now: i64) {
        if !self.enabled {
            return;
        }
        let key = operation.key();
        if self.verbose {
            tracing::debug!("Cached operation {key} with result: {result}");
        }
        self.entries.insert(
            key,
            CacheEntry {
                timestamp: now,
                result,
                payload: payload_digest(operation),
            },
        );
    }

    fn lookup_at(&self, operation: &SyncOperation, now: i64) -> Option<CacheEntry> {
        if !self.enabled {
            return None;
        }

        let key = operation.key();
        // Clone out so the shard guard is released before any removal
        let entry = self.entries.get(&key).map(|entry| entry.clone())?;

        if now.saturating_sub(entry.timestamp) > self.window_ms {
            self.entries
                .remove_if(&key, |_, current| current.timestamp == entry.timestamp);
            if self.verbose {
                tracing::debug!("Cache expired for operation {key}");
            }
            return None;
        }

        if self.verbose {
            tracing::debug!("Cache hit for operation {key}");
        }
        Some(entry)
    }
}

fn payload_digest(operation: &SyncOperation) -> Option<String> {
    operation.password().map(hash_password)
}
