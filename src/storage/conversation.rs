//! Conversation Store
//!
//! Bounded session memory: an ordered sequence of role/content pairs with
//! oldest-first eviction past the capacity. Messages are immutable once
//! appended.

use rusqlite::params;

use draftsmith_core::message::{ChatRole, ConversationMessage};

use crate::error::AppResult;
use crate::storage::Db;

/// Bounded conversation history backed by the session database.
pub struct ConversationStore {
    db: Db,
    capacity: usize,
}

impl ConversationStore {
    pub fn new(db: Db, capacity: usize) -> Self {
        Self { db, capacity }
    }

    /// Append a message, evicting the oldest rows past capacity.
    pub fn append(&self, message: &ConversationMessage) -> AppResult<()> {
        let conn = self.db.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO messages (role, content, created_at) VALUES (?1, ?2, ?3)",
            params![
                message.role.to_string(),
                message.content,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        conn.execute(
            "DELETE FROM messages WHERE id NOT IN (
                SELECT id FROM messages ORDER BY id DESC LIMIT ?1
            )",
            params![self.capacity as i64],
        )?;
        Ok(())
    }

    /// The most recent `limit` messages, oldest first.
    pub fn recent(&self, limit: usize) -> AppResult<Vec<ConversationMessage>> {
        let conn = self.db.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT role, content FROM messages ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (role, content) = row?;
            // Rows with an unknown role tag are skipped, not guessed.
            if let Some(role) = parse_role(&role) {
                messages.push(ConversationMessage { role, content });
            }
        }
        messages.reverse();
        Ok(messages)
    }

    /// Total stored messages.
    pub fn len(&self) -> AppResult<usize> {
        let conn = self.db.lock().expect("database lock poisoned");
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> AppResult<bool> {
        Ok(self.len()? == 0)
    }
}

fn parse_role(raw: &str) -> Option<ChatRole> {
    match raw {
        "user" => Some(ChatRole::User),
        "assistant" => Some(ChatRole::Assistant),
        "system" => Some(ChatRole::System),
        _ => None,
    }
}
