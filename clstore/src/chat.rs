use rusqlite::params;

use crate::{ChatMessageRow, Result, Store};

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<ChatMessageRow> {
    Ok(ChatMessageRow {
        id: row.get("id")?,
        lobby_id: row.get("lobby_id")?,
        user_id: row.get("user_id")?,
        username: row.get("username")?,
        emoji: row.get("emoji")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
    })
}

impl Store {
    pub fn insert_chat_message(&self, message: &ChatMessageRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_messages (id, lobby_id, user_id, username, emoji, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    message.id,
                    message.lobby_id,
                    message.user_id,
                    message.username,
                    message.emoji,
                    message.content,
                    message.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn recent_chat_messages(&self, lobby_id: &str, limit: usize) -> Result<Vec<ChatMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, lobby_id, user_id, username, emoji, content, created_at
                 FROM chat_messages WHERE lobby_id = ?1
                 ORDER BY created_at DESC LIMIT ?2",
            )?;
            let mut rows = stmt
                .query_map(params![lobby_id, limit as i64], row_to_message)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.reverse();
            Ok(rows)
        })
    }
}
