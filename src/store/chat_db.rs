//! SQLite chat database

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::types::{AssistantCreateRequest, AssistantRecord, ChatMessage, Role};

/// SQLite database holding assistants and their message history
pub struct ChatStore {
    conn: Mutex<Connection>,
}

impl ChatStore {
    /// Open or create the database
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS assistants (
                id TEXT PRIMARY KEY,
                instructions TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                assistant_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (assistant_id) REFERENCES assistants(id)
            );

            CREATE INDEX IF NOT EXISTS idx_messages_assistant ON messages(assistant_id, created_at);
            "#,
        )?;

        Ok(())
    }

    /// Create an assistant, discarding any existing conversation with the same id
    pub fn create_assistant(&self, request: &AssistantCreateRequest) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "DELETE FROM messages WHERE assistant_id = ?1",
            params![request.id],
        )?;
        conn.execute(
            r#"
            INSERT INTO assistants (id, instructions, created_at, last_updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                instructions = excluded.instructions,
                created_at = excluded.created_at,
                last_updated_at = excluded.last_updated_at
            "#,
            params![request.id, request.instructions, now, now],
        )?;

        Ok(())
    }

    /// Fetch an assistant row
    pub fn get_assistant(&self, id: &str) -> Result<Option<AssistantRecord>> {
        let conn = self.conn.lock().unwrap();

        let row = conn
            .query_row(
                "SELECT id, instructions, created_at, last_updated_at FROM assistants WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, instructions, created_at, last_updated_at)) => Ok(Some(AssistantRecord {
                id,
                instructions,
                created_at: parse_timestamp(&created_at)?,
                last_updated_at: parse_timestamp(&last_updated_at)?,
            })),
            None => Ok(None),
        }
    }

    /// Append a message and bump the assistant's update time
    pub fn append_message(&self, message: &ChatMessage) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            INSERT INTO messages (id, assistant_id, role, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                message.id.to_string(),
                message.assistant_id,
                message.role.as_str(),
                message.content,
                message.created_at.to_rfc3339(),
            ],
        )?;

        conn.execute(
            "UPDATE assistants SET last_updated_at = ?1 WHERE id = ?2",
            params![message.created_at.to_rfc3339(), message.assistant_id],
        )?;

        Ok(())
    }

    /// Messages created at or after `since`, oldest first, capped to the most recent `limit`
    pub fn messages_since(
        &self,
        assistant_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, assistant_id, role, content, created_at
            FROM messages
            WHERE assistant_id = ?1 AND created_at >= ?2
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?3
            "#,
        )?;

        let rows = stmt.query_map(
            params![assistant_id, since.to_rfc3339(), limit as i64],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(message_from_row(row?)?);
        }
        messages.reverse();
        Ok(messages)
    }

    /// Total number of stored messages for an assistant
    pub fn message_count(&self, assistant_id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE assistant_id = ?1",
            params![assistant_id],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }
}

fn message_from_row(row: (String, String, String, String, String)) -> Result<ChatMessage> {
    let (id, assistant_id, role, content, created_at) = row;

    Ok(ChatMessage {
        id: id
            .parse()
            .map_err(|_| Error::Other(format!("Corrupt message id: {}", id)))?,
        assistant_id,
        role: Role::parse(&role)
            .ok_or_else(|| Error::Other(format!("Unknown message role: {}", role)))?,
        content,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .map_err(|_| Error::Other(format!("Corrupt timestamp: {}", raw)))
}
