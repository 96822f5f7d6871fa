pub mod admin;
pub mod common;
pub mod sync;
pub mod users;
