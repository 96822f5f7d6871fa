//! welcomate-core - Offline-first user store with sync to a remote admin service
//!
//! This crate contains the local user database, the sync primitives (operation
//! cache, batch queue, scoped connections) and the orchestrator that ties them
//! to a remote [`remote::AdminService`].

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod state;
pub mod store;
pub mod sync;
pub mod util;
pub mod validation;

#[cfg(test)]
mod testing;

pub use broker::{BindError, ConnectionBroker, ServiceBinder};
pub use config::{ServiceIdentity, SyncConfig};
pub use error::{Error, Result};
pub use models::{SyncRecord, UserRecord};
pub use remote::{AdminService, RemoteError, RemoteResult};
pub use services::{AdminStore, ClientSyncHandler, UserService};
pub use state::ConnectionState;
pub use store::LocalStore;
pub use sync::{SyncOperation, SyncResult};
