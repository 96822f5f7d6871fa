//! Connection state reported by the orchestrator.

use std::fmt;

/// Where the orchestrator stands with respect to the primary remote handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No primary handle; mutations go local-first
    Offline,
    /// Primary handle set, reconciliation still running
    Reconciling,
    /// Primary handle set and reconciled
    Online,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Offline => "offline",
            Self::Reconciling => "reconciling",
            Self::Online => "online",
        };
        f.write_str(label)
    }
}
