//! User repository implementation

use crate::error::{Error, Result};
use crate::models::{hash_password, UserRecord};
use rusqlite::{params, Connection, OptionalExtension};

const USER_COLUMNS: &str = "id, username, account, password_hash, password_plaintext, is_synced, created_at, updated_at";

/// Trait for user storage operations
pub trait UserRepository {
    /// Insert a new unsynced user
    fn create(&self, username: &str, account: &str, password: &str) -> Result<UserRecord>;

    /// Get a user by username
    fn get(&self, username: &str) -> Result<Option<UserRecord>>;

    /// Get a user by account
    fn get_by_account(&self, account: &str) -> Result<Option<UserRecord>>;

    /// Return the username whose account and password digest match
    fn verify(&self, account: &str, password: &str) -> Result<Option<String>>;

    /// Replace a user's password and clear its synced flag
    fn update_password(&self, username: &str, new_password: &str) -> Result<()>;

    /// Set the synced flag
    fn mark_synced(&self, username: &str) -> Result<()>;

    /// Hard delete a user by username
    fn delete(&self, username: &str) -> Result<()>;

    /// Hard delete a user by account
    fn delete_by_account(&self, account: &str) -> Result<()>;

    /// List all users, oldest first
    fn list(&self) -> Result<Vec<UserRecord>>;

    /// List users whose synced flag is clear, oldest first
    fn list_unsynced(&self) -> Result<Vec<UserRecord>>;

    /// Remove every user, returning the number of rows deleted
    fn clear(&self) -> Result<usize>;
}

/// `SQLite` implementation of `UserRepository`
pub struct SqliteUserRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteUserRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a user from a database row
    fn parse_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
        Ok(UserRecord {
            id: row.get(0)?,
            username: row.get(1)?,
            account: row.get(2)?,
            password_hash: row.get(3)?,
            password_plaintext: row.get(4)?,
            synced: row.get::<_, i32>(5)? != 0,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn query_one(&self, filter: &str, value: &str) -> Result<Option<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter} = ?");
        Ok(self
            .conn
            .query_row(&sql, params![value], Self::parse_user)
            .optional()?)
    }

    fn query_many(&self, filter: &str) -> Result<Vec<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users {filter} ORDER BY id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let users = stmt
            .query_map([], Self::parse_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create(&self, username: &str, account: &str, password: &str) -> Result<UserRecord> {
        let now = chrono::Utc::now().timestamp_millis();

        self.conn.execute(
            "INSERT INTO users
                (username, account, password_hash, password_plaintext, is_synced, created_at, updated_at)
             VALUES (?, ?, ?, ?, 0, ?, ?)",
            params![username, account, hash_password(password), password, now, now],
        )?;

        Ok(UserRecord {
            id: self.conn.last_insert_rowid(),
            username: username.to_string(),
            account: account.to_string(),
            password_hash: hash_password(password),
            password_plaintext: password.to_string(),
            synced: false,
            created_at: now,
            updated_at: now,
        })
    }

    fn get(&self, username: &str) -> Result<Option<UserRecord>> {
        self.query_one("username", username)
    }

    fn get_by_account(&self, account: &str) -> Result<Option<UserRecord>> {
        self.query_one("account", account)
    }

    fn verify(&self, account: &str, password: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT username FROM users WHERE account = ? AND password_hash = ?",
                params![account, hash_password(password)],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn update_password(&self, username: &str, new_password: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();

        let rows = self.conn.execute(
            "UPDATE users
             SET password_hash = ?, password_plaintext = ?, is_synced = 0, updated_at = ?
             WHERE username = ?",
            params![hash_password(new_password), new_password, now, username],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(username.to_string()));
        }
        Ok(())
    }

    fn mark_synced(&self, username: &str) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE users SET is_synced = 1 WHERE username = ?",
            params![username],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(username.to_string()));
        }
        Ok(())
    }

    fn delete(&self, username: &str) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM users WHERE username = ?", params![username])?;

        if rows == 0 {
            return Err(Error::NotFound(username.to_string()));
        }
        Ok(())
    }

    fn delete_by_account(&self, account: &str) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM users WHERE account = ?", params![account])?;

        if rows == 0 {
            return Err(Error::NotFound(account.to_string()));
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<UserRecord>> {
        self.query_many("")
    }

    fn list_unsynced(&self) -> Result<Vec<UserRecord>> {
        self.query_many("WHERE is_synced = 0")
    }

    fn clear(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM users", [])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let db = setup();
        let repo = SqliteUserRepository::new(db.connection());

        let user = repo.create("alice", "a1", "p1").unwrap();
        assert!(!user.synced);
        assert_eq!(user.password_hash, hash_password("p1"));

        let fetched = repo.get("alice").unwrap().unwrap();
        assert_eq!(fetched, user);
        assert_eq!(repo.get_by_account("a1").unwrap().unwrap().username, "alice");
    }

    #[test]
    fn test_create_duplicate_fails() {
        let db = setup();
        let repo = SqliteUserRepository::new(db.connection());

        repo.create("alice", "a1", "p1").unwrap();
        assert!(repo.create("alice", "a2", "p1").is_err());
        assert!(repo.create("bob", "a1", "p1").is_err());
    }

    #[test]
    fn test_verify_compares_digest() {
        let db = setup();
        let repo = SqliteUserRepository::new(db.connection());

        repo.create("alice", "a1", "p1").unwrap();
        assert_eq!(repo.verify("a1", "p1").unwrap().as_deref(), Some("alice"));
        assert_eq!(repo.verify("a1", "wrong").unwrap(), None);
        assert_eq!(repo.verify("missing", "p1").unwrap(), None);
    }

    #[test]
    fn test_update_password_resets_synced() {
        let db = setup();
        let repo = SqliteUserRepository::new(db.connection());

        repo.create("alice", "a1", "p1").unwrap();
        repo.mark_synced("alice").unwrap();
        repo.update_password("alice", "p2").unwrap();

        let user = repo.get("alice").unwrap().unwrap();
        assert!(!user.synced);
        assert_eq!(user.password_plaintext, "p2");
        assert_eq!(repo.verify("a1", "p2").unwrap().as_deref(), Some("alice"));
        assert!(matches!(
            repo.update_password("nobody", "x"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_list_unsynced() {
        let db = setup();
        let repo = SqliteUserRepository::new(db.connection());

        repo.create("alice", "a1", "p1").unwrap();
        repo.create("bob", "b1", "p2").unwrap();
        repo.mark_synced("alice").unwrap();

        let unsynced = repo.list_unsynced().unwrap();
        assert_eq!(unsynced.len(), 1);
        assert_eq!(unsynced[0].username, "bob");
        assert_eq!(repo.list().unwrap().len(), 2);
    }

    #[test]
    fn test_delete_variants() {
        let db = setup();
        let repo = SqliteUserRepository::new(db.connection());

        repo.create("alice", "a1", "p1").unwrap();
        repo.create("bob", "b1", "p2").unwrap();

        repo.delete("alice").unwrap();
        repo.delete_by_account("b1").unwrap();
        assert!(repo.list().unwrap().is_empty());
        assert!(matches!(repo.delete("alice"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_clear() {
        let db = setup();
        let repo = SqliteUserRepository::new(db.connection());

        repo.create("alice", "a1", "p1").unwrap();
        repo.create("bob", "b1", "p2").unwrap();
        assert_eq!(repo.clear().unwrap(), 2);
        assert_eq!(repo.clear().unwrap(), 0);
    }
}
