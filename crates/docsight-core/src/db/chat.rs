//! Chat session and message operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{ChatMessage, ChatRole, ChatSession};

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<ChatSession> {
    let created_at: String = row.get(3)?;
    Ok(ChatSession {
        id: row.get(0)?,
        owner: row.get(1)?,
        title: row.get(2)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    pub fn create_chat_session(&self, owner: &str, title: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO chat_sessions (owner, title) VALUES (?, ?)",
            params![owner, title],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_chat_session(&self, id: i64) -> Result<Option<ChatSession>> {
        let conn = self.conn()?;
        let session = conn
            .query_row(
                "SELECT id, owner, title, created_at FROM chat_sessions WHERE id = ?",
                params![id],
                row_to_session,
            )
            .optional()?;
        Ok(session)
    }

    /// List an owner's chat sessions, newest first
    pub fn list_chat_sessions(&self, owner: &str) -> Result<Vec<ChatSession>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, owner, title, created_at
            FROM chat_sessions
            WHERE owner = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )?;
        let sessions = stmt
            .query_map(params![owner], row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    pub fn add_chat_message(&self, session_id: i64, role: ChatRole, content: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO chat_messages (session_id, role, content) VALUES (?, ?, ?)",
            params![session_id, role.as_str(), content],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Messages in a session, in the order they were sent
    pub fn list_chat_messages(&self, session_id: i64) -> Result<Vec<ChatMessage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, session_id, role, content, created_at
            FROM chat_messages
            WHERE session_id = ?
            ORDER BY id ASC
            "#,
        )?;
        let messages = stmt
            .query_map(params![session_id], |row| {
                let role: String = row.get(2)?;
                let created_at: String = row.get(4)?;
                Ok(ChatMessage {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    role: role.parse().unwrap_or(ChatRole::User),
                    content: row.get(3)?,
                    created_at: parse_datetime(&created_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(messages)
    }
}
