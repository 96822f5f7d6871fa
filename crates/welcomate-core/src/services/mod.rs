//! High-level services built on the local store and the sync subsystem.

mod admin_store;
mod client_sync;
mod user_service;

pub use admin_store::{AdminLogin, AdminStore, AdminUser, Role};
pub use client_sync::ClientSyncHandler;
pub use user_service::{ReconcileReport, UserService};
