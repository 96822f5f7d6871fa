//! Sync subsystem configuration.
//!
//! Provides `SyncConfig`, the knobs consumed by the operation cache, the
//! batch queue and the orchestrator, plus the identity of the remote admin
//! service. Values come from an optional JSON file with `WELCOMATE_*`
//! environment overrides applied on top.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{normalize_text_option, parse_flag};

const DEFAULT_MAX_BATCH_SIZE: usize = 10;
const DEFAULT_CACHE_WINDOW_MS: u64 = 30_000;
const DEFAULT_QUEUE_CAPACITY: usize = 256;
const DEFAULT_CALL_TIMEOUT_MS: u64 = 5_000;

pub const DEFAULT_SERVICE_PACKAGE: &str = "com.surpasslike.welcomateservice";
pub const DEFAULT_SERVICE_CLASS: &str = "com.surpasslike.welcomateservice.service.AdminService";

/// Address of a bindable remote service (package + class).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceIdentity {
    pub package: String,
    pub class: String,
}

impl ServiceIdentity {
    pub fn new(package: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            class: class.into(),
        }
    }
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_PACKAGE, DEFAULT_SERVICE_CLASS)
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.class)
    }
}

/// Tunables for the sync subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Maximum operations drained per batch dispatch cycle
    pub max_batch_size: usize,
    /// How long a recorded outcome suppresses an equivalent operation
    pub cache_window_ms: u64,
    /// Disable to make every cache lookup a miss
    pub cache_enabled: bool,
    /// Emit per-operation debug lines from the cache and queue
    pub debug_logging: bool,
    /// Upper bound on pending operations
    pub queue_capacity: usize,
    /// Upper bound on a single remote call during batch dispatch
    pub call_timeout_ms: u64,
    /// Remote admin service to bind
    pub service: ServiceIdentity,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            cache_window_ms: DEFAULT_CACHE_WINDOW_MS,
            cache_enabled: true,
            debug_logging: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            service: ServiceIdentity::default(),
        }
    }
}

impl SyncConfig {
    /// Parse a config from a JSON payload, rejecting unknown fields.
    pub fn from_json(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No sync config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let payload = std::fs::read_to_string(path)?;
        Self::from_json(&payload)
    }

    /// Apply `WELCOMATE_*` overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (testable without touching the environment).
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| normalize_text_option(lookup(key));

        if let Some(value) = get("WELCOMATE_MAX_BATCH_SIZE").and_then(|v| v.parse().ok()) {
            self.max_batch_size = value;
        }
        if let Some(value) = get("WELCOMATE_CACHE_WINDOW_MS").and_then(|v| v.parse().ok()) {
            self.cache_window_ms = value;
        }
        if let Some(value) = get("WELCOMATE_CACHE_ENABLED") {
            self.cache_enabled = parse_flag(&value);
        }
        if let Some(value) = get("WELCOMATE_DEBUG_SYNC") {
            self.debug_logging = parse_flag(&value);
        }
        if let Some(package) = get("WELCOMATE_SERVICE_PACKAGE") {
            self.service.package = package;
        }
        if let Some(class) = get("WELCOMATE_SERVICE_CLASS") {
            self.service.class = class;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(Error::Config("max_batch_size must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::Config("queue_capacity must be at least 1".into()));
        }
        if self.service.package.trim().is_empty() || self.service.class.trim().is_empty() {
            return Err(Error::Config("service package and class are required".into()));
        }
        Ok(())
    }

    pub const fn cache_window(&self) -> Duration {
        Duration::from_millis(self.cache_window_ms)
    }

    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}
