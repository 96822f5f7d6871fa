//! Database layer for the local user store

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{SqliteUserRepository, UserRepository};
