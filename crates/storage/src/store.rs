//! SQLite store implementation.

use crate::Result;
use rusqlite::Connection;
use std::path::Path;

/// SQLite-backed store for content, the activity ledger, opinions, and roles.
///
/// All mutating operations run inside a single transaction on the wrapped
/// connection. Referential integrity (including every cascade in the data
/// model) is declared in the schema rather than enforced by application code,
/// so foreign-key enforcement is switched on for every connection.
pub struct Store {
    pub(crate) conn: Connection,
}

impl Store {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                scrambler_algorithm INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS roles (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- A user can hold any number of roles, each at most once.
            CREATE TABLE IF NOT EXISTS user_roles (
                user_id INTEGER NOT NULL
                    REFERENCES users(id) ON DELETE CASCADE,
                role_id INTEGER NOT NULL
                    REFERENCES roles(id) ON DELETE CASCADE,
                UNIQUE (user_id, role_id)
            );

            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                scrambled_body TEXT NOT NULL,
                user_id INTEGER NOT NULL
                    REFERENCES users(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS post_comments (
                id INTEGER PRIMARY KEY,
                content TEXT NOT NULL,
                scrambled_content TEXT NOT NULL,
                post_id INTEGER NOT NULL
                    REFERENCES posts(id) ON DELETE CASCADE,
                user_id INTEGER NOT NULL
                    REFERENCES users(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- The activity ledger. Exactly one of the five reference columns
            -- is set per row; deleting the referenced row deletes the entry.
            CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY,
                user_id INTEGER
                    REFERENCES users(id) ON DELETE CASCADE,
                role_id INTEGER
                    REFERENCES roles(id) ON DELETE CASCADE,
                post_id INTEGER
                    REFERENCES posts(id) ON DELETE CASCADE,
                post_comment_id INTEGER
                    REFERENCES post_comments(id) ON DELETE CASCADE,
                like_id INTEGER
                    REFERENCES likes(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- The unique index is the backstop for concurrent opinion
            -- changes: a user holds at most one opinion per entry.
            CREATE TABLE IF NOT EXISTS likes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                is_like INTEGER NOT NULL,
                user_id INTEGER NOT NULL
                    REFERENCES users(id) ON DELETE CASCADE,
                likeable_id INTEGER NOT NULL
                    REFERENCES entries(id) ON DELETE CASCADE,
                UNIQUE (user_id, likeable_id)
            );

            -- At most one attributed user per entry.
            CREATE TABLE IF NOT EXISTS user_actions (
                user_id INTEGER NOT NULL
                    REFERENCES users(id) ON DELETE CASCADE,
                entry_id INTEGER NOT NULL UNIQUE
                    REFERENCES entries(id) ON DELETE CASCADE
            );
            "#,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_initializes_in_memory() {
        let store = Store::in_memory().unwrap();
        let enforced: i64 = store
            .conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enforced, 1);
    }

    #[test]
    fn schema_init_is_idempotent() {
        let store = Store::in_memory().unwrap();
        store.init_schema().unwrap();
    }
}
