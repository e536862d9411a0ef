//! SQLite-based inbox storage

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use rusqlite_migration::{M, Migrations};

use super::InboxStore;
use crate::models::{
    Conversation, ConversationId, ConversationStatus, Direction, Message, MessageBody, MessageId,
    Platform,
};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            -- Conversation metadata
            CREATE TABLE conversations (
                id TEXT PRIMARY KEY,
                contact_name TEXT NOT NULL,
                contact_handle TEXT NOT NULL,
                platform TEXT NOT NULL,
                preview TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                archived INTEGER NOT NULL DEFAULT 0,
                last_activity_at TEXT NOT NULL
            );

            CREATE INDEX idx_conversations_last_activity
                ON conversations(last_activity_at DESC);

            -- Messages with the body stored as a tagged JSON union
            CREATE TABLE messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                direction TEXT NOT NULL,
                body TEXT NOT NULL,
                sender_name TEXT NOT NULL,
                sender_handle TEXT NOT NULL,
                sent_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                seq INTEGER NOT NULL,
                FOREIGN KEY (conversation_id) REFERENCES conversations(id)
            );

            CREATE INDEX idx_messages_conversation_order
                ON messages(conversation_id, sent_at ASC, seq ASC);
            "#,
        ),
    ])
}

/// Format a timestamp with fixed-width fractional seconds so that the TEXT
/// column sorts chronologically.
fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp in database: {}", s))?
        .with_timezone(&Utc))
}

/// SQLite-based inbox storage
pub struct SqliteInboxStore {
    conn: Mutex<Connection>,
}

/// Raw message row before domain conversion
type MessageRow = (
    String, // id
    String, // conversation_id
    String, // direction
    String, // body json
    String, // sender_name
    String, // sender_handle
    String, // sent_at
    String, // created_at
    bool,   // is_read
);

impl SqliteInboxStore {
    /// Create a new SQLite inbox store
    ///
    /// - `db_path`: Path to the SQLite database file
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;

        // WAL keeps readers unblocked during writes; NORMAL sync is safe
        // in combination with WAL.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conversation_from_row(
        id: String,
        contact_name: String,
        contact_handle: String,
        platform: String,
        preview: String,
        status: String,
        tags: String,
        archived: bool,
        last_activity_at: String,
    ) -> Result<Conversation> {
        let platform = Platform::parse(&platform)
            .ok_or_else(|| anyhow!("Unknown platform in database: {}", platform))?;
        let status = match status.as_str() {
            "read" => ConversationStatus::Read,
            "unread" => ConversationStatus::Unread,
            other => return Err(anyhow!("Unknown conversation status: {}", other)),
        };
        let tags: Vec<String> =
            serde_json::from_str(&tags).context("Invalid tags JSON in database")?;

        Ok(Conversation {
            id: ConversationId::new(id),
            contact_name,
            contact_handle,
            platform,
            preview,
            status,
            tags,
            archived,
            last_activity_at: decode_ts(&last_activity_at)?,
        })
    }

    fn message_from_row(row: MessageRow) -> Result<Message> {
        let (id, conversation_id, direction, body, sender_name, sender_handle, sent_at, created_at, is_read) =
            row;

        let direction = match direction.as_str() {
            "inbound" => Direction::Inbound,
            "outbound" => Direction::Outbound,
            other => return Err(anyhow!("Unknown message direction: {}", other)),
        };
        let body: MessageBody =
            serde_json::from_str(&body).context("Invalid message body JSON in database")?;

        Ok(Message {
            id: MessageId::new(id),
            conversation_id: ConversationId::new(conversation_id),
            direction,
            body,
            sender_name,
            sender_handle,
            sent_at: decode_ts(&sent_at)?,
            created_at: decode_ts(&created_at)?,
            read: is_read,
        })
    }

    fn direction_str(direction: Direction) -> &'static str {
        match direction {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }

    fn status_str(status: ConversationStatus) -> &'static str {
        match status {
            ConversationStatus::Read => "read",
            ConversationStatus::Unread => "unread",
        }
    }
}

impl InboxStore for SqliteInboxStore {
    fn upsert_conversation(&self, conversation: Conversation) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let tags = serde_json::to_string(&conversation.tags)?;
        conn.execute(
            r#"
            INSERT INTO conversations
                (id, contact_name, contact_handle, platform, preview, status, tags, archived, last_activity_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                contact_name = excluded.contact_name,
                contact_handle = excluded.contact_handle,
                platform = excluded.platform,
                preview = excluded.preview,
                status = excluded.status,
                tags = excluded.tags,
                archived = excluded.archived,
                last_activity_at = excluded.last_activity_at
            "#,
            params![
                conversation.id.as_str(),
                conversation.contact_name,
                conversation.contact_handle,
                conversation.platform.as_str(),
                conversation.preview,
                Self::status_str(conversation.status),
                tags,
                conversation.archived,
                encode_ts(conversation.last_activity_at),
            ],
        )?;
        Ok(())
    }

    fn get_conversation(&self, id: &ConversationId) -> Result<Option<Conversation>> {
        let conn = self.conn.lock().unwrap();
        let row: Option<(String, String, String, String, String, String, String, bool, String)> =
            conn.query_row(
                "SELECT id, contact_name, contact_handle, platform, preview, status, tags, archived, last_activity_at
                 FROM conversations WHERE id = ?",
                [id.as_str()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, name, handle, platform, preview, status, tags, archived, ts)) => {
                Ok(Some(Self::conversation_from_row(
                    id, name, handle, platform, preview, status, tags, archived, ts,
                )?))
            }
            None => Ok(None),
        }
    }

    fn has_conversation(&self, id: &ConversationId) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM conversations WHERE id = ?",
            [id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn list_conversations(&self, limit: usize, offset: usize) -> Result<Vec<Conversation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, contact_name, contact_handle, platform, preview, status, tags, archived, last_activity_at
             FROM conversations
             WHERE archived = 0
             ORDER BY last_activity_at DESC
             LIMIT ? OFFSET ?",
        )?;

        let rows: Vec<(String, String, String, String, String, String, String, bool, String)> =
            stmt.query_map(params![limit as i64, offset as i64], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, handle, platform, preview, status, tags, archived, ts)| {
                Self::conversation_from_row(
                    id, name, handle, platform, preview, status, tags, archived, ts,
                )
            })
            .collect()
    }

    fn set_conversation_status(
        &self,
        id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE conversations SET status = ? WHERE id = ?",
            params![Self::status_str(status), id.as_str()],
        )?;
        Ok(updated > 0)
    }

    fn set_conversation_archived(&self, id: &ConversationId, archived: bool) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE conversations SET archived = ? WHERE id = ?",
            params![archived, id.as_str()],
        )?;
        Ok(updated > 0)
    }

    fn set_conversation_tags(&self, id: &ConversationId, tags: Vec<String>) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let tags = serde_json::to_string(&tags)?;
        let updated = conn.execute(
            "UPDATE conversations SET tags = ? WHERE id = ?",
            params![tags, id.as_str()],
        )?;
        Ok(updated > 0)
    }

    fn update_conversation_preview(
        &self,
        id: &ConversationId,
        preview: &str,
        last_activity_at: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE conversations SET preview = ?, last_activity_at = ? WHERE id = ?",
            params![preview, encode_ts(last_activity_at), id.as_str()],
        )?;
        Ok(updated > 0)
    }

    fn upsert_message(&self, message: Message) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let body = serde_json::to_string(&message.body)?;

        let existing_seq: Option<i64> = conn
            .query_row(
                "SELECT seq FROM messages WHERE id = ?",
                [message.id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match existing_seq {
            // Keep the original seq so insertion-order ties stay stable
            Some(seq) => {
                conn.execute(
                    r#"
                    UPDATE messages SET
                        conversation_id = ?1, direction = ?2, body = ?3,
                        sender_name = ?4, sender_handle = ?5,
                        sent_at = ?6, created_at = ?7, is_read = ?8, seq = ?9
                    WHERE id = ?10
                    "#,
                    params![
                        message.conversation_id.as_str(),
                        Self::direction_str(message.direction),
                        body,
                        message.sender_name,
                        message.sender_handle,
                        encode_ts(message.sent_at),
                        encode_ts(message.created_at),
                        message.read,
                        seq,
                        message.id.as_str(),
                    ],
                )?;
            }
            None => {
                conn.execute(
                    r#"
                    INSERT INTO messages
                        (id, conversation_id, direction, body, sender_name, sender_handle,
                         sent_at, created_at, is_read, seq)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
                            (SELECT COALESCE(MAX(seq), -1) + 1 FROM messages))
                    "#,
                    params![
                        message.id.as_str(),
                        message.conversation_id.as_str(),
                        Self::direction_str(message.direction),
                        body,
                        message.sender_name,
                        message.sender_handle,
                        encode_ts(message.sent_at),
                        encode_ts(message.created_at),
                        message.read,
                    ],
                )?;
            }
        }

        Ok(())
    }

    fn get_message(&self, id: &MessageId) -> Result<Option<Message>> {
        let conn = self.conn.lock().unwrap();
        let row: Option<MessageRow> = conn
            .query_row(
                "SELECT id, conversation_id, direction, body, sender_name, sender_handle,
                        sent_at, created_at, is_read
                 FROM messages WHERE id = ?",
                [id.as_str()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some(row) => Ok(Some(Self::message_from_row(row)?)),
            None => Ok(None),
        }
    }

    fn has_message(&self, id: &MessageId) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE id = ?",
            [id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn list_messages_for_conversation(&self, id: &ConversationId) -> Result<Vec<Message>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, direction, body, sender_name, sender_handle,
                    sent_at, created_at, is_read
             FROM messages
             WHERE conversation_id = ?
             ORDER BY sent_at ASC, seq ASC",
        )?;

        let rows: Vec<MessageRow> = stmt
            .query_map([id.as_str()], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(Self::message_from_row).collect()
    }

    fn mark_messages_read(&self, id: &ConversationId) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE messages SET is_read = 1 WHERE conversation_id = ? AND is_read = 0",
            [id.as_str()],
        )?;
        Ok(changed)
    }

    fn count_conversations(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn count_messages_in_conversation(&self, id: &ConversationId) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = ?",
            [id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM messages", [])?;
        conn.execute("DELETE FROM conversations", [])?;
        Ok(())
    }
}
