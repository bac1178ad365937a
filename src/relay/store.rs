//! Persistent SQLite storage for users, relayed messages, and comments.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// A person who has contacted the bot at least once.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub joined_at: String,
}

/// A relayed message as recorded in the store.
///
/// `delivery_id` is the platform message id of the delivered copy in the
/// receiver's chat. Replies to that copy are routed by looking it up here.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub text: Option<String>,
    pub delivery_id: Option<i64>,
    pub created_at: String,
}

/// A free-form comment left through the comments menu.
#[derive(Debug, Clone)]
pub struct Comment {
    pub id: i64,
    pub user_id: Option<i64>,
    pub body: String,
    pub created_at: String,
}

/// Persistent SQLite store for the relay.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;

        let (users, messages, comments) = store.counts()?;
        info!("Opened store at {:?} ({} users, {} messages, {} comments)", path, users, messages, comments);

        Ok(store)
    }

    /// Create an in-memory store.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        // Sender and receiver ids are chat endpoints, not necessarily
        // registered users, so the tables carry no foreign keys;
        // delete_user does its own cleanup.
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS users (
                telegram_id INTEGER PRIMARY KEY,
                username TEXT,
                first_name TEXT,
                last_name TEXT,
                joined_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sender_id INTEGER NOT NULL,
                receiver_id INTEGER NOT NULL,
                text TEXT,
                delivery_id INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id);
            CREATE INDEX IF NOT EXISTS idx_messages_receiver ON messages(receiver_id);
            CREATE INDEX IF NOT EXISTS idx_messages_delivery ON messages(delivery_id);
            CREATE INDEX IF NOT EXISTS idx_messages_created ON messages(created_at);
            CREATE INDEX IF NOT EXISTS idx_comments_user ON comments(user_id);
        "#)?;

        Ok(())
    }

    fn counts(&self) -> Result<(usize, usize, usize), StoreError> {
        let conn = self.conn.lock().unwrap();
        let users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        let messages: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        let comments: i64 = conn.query_row("SELECT COUNT(*) FROM comments", [], |row| row.get(0))?;
        Ok((users as usize, messages as usize, comments as usize))
    }

    // ==================== USER METHODS ====================

    /// Register a user, idempotently.
    ///
    /// The first call inserts the row; every later call for the same id
    /// returns the stored row unchanged, keeping the original names and
    /// join date.
    pub fn register_user(
        &self,
        telegram_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
        joined_at: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        let conn = self.conn.lock().unwrap();

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (telegram_id, username, first_name, last_name, joined_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![telegram_id, username, first_name, last_name, joined_at.to_rfc3339()],
        )?;
        if inserted > 0 {
            info!("👋 Registered user {}", telegram_id);
        }

        let user = conn.query_row(
            "SELECT telegram_id, username, first_name, last_name, joined_at
             FROM users WHERE telegram_id = ?1",
            params![telegram_id],
            row_to_user,
        )?;

        Ok(user)
    }

    /// Fetch a user by id.
    pub fn get_user(&self, telegram_id: i64) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let user = conn.query_row(
            "SELECT telegram_id, username, first_name, last_name, joined_at
             FROM users WHERE telegram_id = ?1",
            params![telegram_id],
            row_to_user,
        ).optional()?;
        Ok(user)
    }

    /// Remove a user and apply the cleanup policies in one transaction:
    /// their comments are kept with the author detached, and every message
    /// they sent or received is deleted.
    ///
    /// Returns `false` if no such user existed.
    pub fn delete_user(&self, telegram_id: i64) -> Result<bool, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE comments SET user_id = NULL WHERE user_id = ?1",
            params![telegram_id],
        )?;
        tx.execute(
            "DELETE FROM messages WHERE sender_id = ?1 OR receiver_id = ?1",
            params![telegram_id],
        )?;
        let removed = tx.execute(
            "DELETE FROM users WHERE telegram_id = ?1",
            params![telegram_id],
        )?;

        tx.commit()?;
        Ok(removed > 0)
    }

    /// Total users ever registered.
    pub fn user_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    // ==================== MESSAGE METHODS ====================

    /// Record a relayed message.
    ///
    /// Called once per successful delivery; `delivery_id` is the message id
    /// the platform assigned to the delivered copy. Rows are never updated
    /// afterwards.
    pub fn record_message(
        &self,
        sender_id: i64,
        receiver_id: i64,
        text: Option<&str>,
        delivery_id: Option<i64>,
        at: Option<DateTime<Utc>>,
    ) -> Result<StoredMessage, StoreError> {
        let created_at = at.unwrap_or_else(Utc::now).to_rfc3339();
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO messages (sender_id, receiver_id, text, delivery_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![sender_id, receiver_id, text, delivery_id, created_at],
        )?;

        Ok(StoredMessage {
            id: conn.last_insert_rowid(),
            sender_id,
            receiver_id,
            text: text.map(str::to_string),
            delivery_id,
            created_at,
        })
    }

    /// Resolve the counterparty for a reply.
    ///
    /// Looks up the message whose delivered copy carries `delivery_id` and
    /// returns the other end of it relative to `requester`. A requester who
    /// is neither the sender nor the receiver gets no route, and neither
    /// does an unknown delivery id.
    pub fn find_counterparty(&self, delivery_id: i64, requester: i64) -> Result<Option<i64>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let endpoints = conn.query_row(
            "SELECT sender_id, receiver_id FROM messages
             WHERE delivery_id = ?1 ORDER BY id DESC LIMIT 1",
            params![delivery_id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        ).optional()?;

        Ok(endpoints.and_then(|(sender, receiver)| {
            if requester == receiver {
                Some(sender)
            } else if requester == sender {
                Some(receiver)
            } else {
                None
            }
        }))
    }

    /// Total messages recorded.
    pub fn message_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    // ==================== COMMENT METHODS ====================

    /// Record a comment. `author` is kept nullable so comments survive the
    /// removal of their author.
    pub fn record_comment(
        &self,
        author: Option<i64>,
        body: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<Comment, StoreError> {
        let created_at = at.unwrap_or_else(Utc::now).to_rfc3339();
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO comments (user_id, body, created_at) VALUES (?1, ?2, ?3)",
            params![author, body, created_at],
        )?;

        Ok(Comment {
            id: conn.last_insert_rowid(),
            user_id: author,
            body: body.to_string(),
            created_at,
        })
    }

    /// Fetch a comment by id.
    pub fn get_comment(&self, id: i64) -> Result<Option<Comment>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let comment = conn.query_row(
            "SELECT id, user_id, body, created_at FROM comments WHERE id = ?1",
            params![id],
            |row| Ok(Comment {
                id: row.get(0)?,
                user_id: row.get(1)?,
                body: row.get(2)?,
                created_at: row.get(3)?,
            }),
        ).optional()?;
        Ok(comment)
    }

    /// Total comments recorded.
    pub fn comment_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM comments", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        telegram_id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        joined_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn joined(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn store_with_users(ids: &[i64]) -> Store {
        let store = Store::in_memory().unwrap();
        for id in ids {
            store.register_user(*id, None, Some("User"), None, joined(9)).unwrap();
        }
        store
    }

    #[test]
    fn test_register_user_inserts_once() {
        let store = Store::in_memory().unwrap();
        let user = store.register_user(100, Some("alice"), Some("Alice"), None, joined(9)).unwrap();

        assert_eq!(user.telegram_id, 100);
        assert_eq!(user.username.as_deref(), Some("alice"));
        assert_eq!(user.joined_at, joined(9).to_rfc3339());
        assert_eq!(store.user_count().unwrap(), 1);
    }

    #[test]
    fn test_register_user_is_idempotent() {
        let store = Store::in_memory().unwrap();
        let first = store.register_user(100, Some("alice"), Some("Alice"), Some("A"), joined(9)).unwrap();
        let second = store.register_user(100, Some("renamed"), Some("Other"), None, joined(17)).unwrap();

        assert_eq!(second, first);
        assert_eq!(second.joined_at, joined(9).to_rfc3339());
        assert_eq!(store.user_count().unwrap(), 1);
    }

    #[test]
    fn test_find_counterparty_round_trip() {
        let store = store_with_users(&[100, 200]);
        store.record_message(100, 200, Some("hi"), Some(555), None).unwrap();

        // Receiver resolves the sender, sender resolves the receiver.
        assert_eq!(store.find_counterparty(555, 200).unwrap(), Some(100));
        assert_eq!(store.find_counterparty(555, 100).unwrap(), Some(200));
    }

    #[test]
    fn test_find_counterparty_unknown_delivery_id() {
        let store = store_with_users(&[100, 200]);
        store.record_message(100, 200, Some("hi"), Some(555), None).unwrap();

        assert_eq!(store.find_counterparty(556, 200).unwrap(), None);
    }

    #[test]
    fn test_find_counterparty_rejects_third_party() {
        let store = store_with_users(&[100, 200, 300]);
        store.record_message(100, 200, Some("hi"), Some(555), None).unwrap();

        assert_eq!(store.find_counterparty(555, 300).unwrap(), None);
    }

    #[test]
    fn test_reply_chain_stays_routable() {
        let store = store_with_users(&[100, 200]);

        // A -> B delivered as 10, B -> A reply delivered as 11, and so on.
        store.record_message(100, 200, Some("first"), Some(10), None).unwrap();
        assert_eq!(store.find_counterparty(10, 200).unwrap(), Some(100));

        store.record_message(200, 100, Some("second"), Some(11), None).unwrap();
        assert_eq!(store.find_counterparty(11, 100).unwrap(), Some(200));

        store.record_message(100, 200, Some("third"), Some(12), None).unwrap();
        assert_eq!(store.find_counterparty(12, 200).unwrap(), Some(100));

        // Old links in the chain still resolve.
        assert_eq!(store.find_counterparty(10, 200).unwrap(), Some(100));
    }

    #[test]
    fn test_record_message_without_text() {
        let store = store_with_users(&[100, 200]);
        let msg = store.record_message(100, 200, None, Some(20), None).unwrap();

        assert_eq!(msg.text, None);
        assert_eq!(store.find_counterparty(20, 200).unwrap(), Some(100));
    }

    #[test]
    fn test_record_comment_with_and_without_author() {
        let store = store_with_users(&[100]);

        let owned = store.record_comment(Some(100), "love it", None).unwrap();
        assert_eq!(owned.user_id, Some(100));
        assert_eq!(owned.body, "love it");

        let anonymous = store.record_comment(None, "detached", None).unwrap();
        assert_eq!(anonymous.user_id, None);
        assert_eq!(store.comment_count().unwrap(), 2);
    }

    #[test]
    fn test_delete_user_detaches_comments_and_purges_messages() {
        let store = store_with_users(&[100, 200]);
        let comment = store.record_comment(Some(100), "keep me", None).unwrap();
        store.record_message(100, 200, Some("out"), Some(30), None).unwrap();
        store.record_message(200, 100, Some("in"), Some(31), None).unwrap();

        assert!(store.delete_user(100).unwrap());

        // Comment survives with the author detached.
        let kept = store.get_comment(comment.id).unwrap().unwrap();
        assert_eq!(kept.user_id, None);
        assert_eq!(kept.body, "keep me");

        // Messages in both directions are gone, and nothing routes to 100.
        assert_eq!(store.message_count().unwrap(), 0);
        assert_eq!(store.find_counterparty(30, 200).unwrap(), None);
        assert_eq!(store.find_counterparty(31, 200).unwrap(), None);

        assert!(store.get_user(100).unwrap().is_none());
        assert!(store.get_user(200).unwrap().is_some());
    }

    #[test]
    fn test_delete_unknown_user_returns_false() {
        let store = Store::in_memory().unwrap();
        assert!(!store.delete_user(404).unwrap());
    }

    #[test]
    fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.db");

        {
            let store = Store::open(&path).unwrap();
            store.register_user(100, Some("alice"), Some("Alice"), None, joined(9)).unwrap();
        }

        // Reopen and verify the row persisted.
        let store = Store::open(&path).unwrap();
        let user = store.get_user(100).unwrap().unwrap();
        assert_eq!(user.username.as_deref(), Some("alice"));
    }
}
