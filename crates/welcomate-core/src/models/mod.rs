//! Data models for Welcomate

mod user;

pub use user::{decode_records, encode_records, hash_password, SyncRecord, UserRecord};
