use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::{Error, ListeningMode, LobbyRow, Result, Store};

fn row_to_lobby(row: &rusqlite::Row) -> rusqlite::Result<LobbyRow> {
    let mode: String = row.get("listening_mode")?;
    Ok(LobbyRow {
        id: row.get("id")?,
        host_id: row.get("host_id")?,
        name: row.get("name")?,
        listening_mode: mode.parse().unwrap_or(ListeningMode::Synchronized),
        created_at: row.get("created_at")?,
        last_activity: row.get("last_activity")?,
    })
}

impl Store {
    pub fn insert_lobby(&self, lobby: &LobbyRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO lobbies (id, host_id, name, listening_mode, created_at, last_activity)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    lobby.id,
                    lobby.host_id,
                    lobby.name,
                    lobby.listening_mode.as_str(),
                    lobby.created_at,
                    lobby.last_activity,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_lobby(&self, id: &str) -> Result<LobbyRow> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, host_id, name, listening_mode, created_at, last_activity
                 FROM lobbies WHERE id = ?1",
                params![id],
                row_to_lobby,
            )
        })
        .map_err(|e| if matches!(e, Error::Sqlite(rusqlite::Error::QueryReturnedNoRows)) {
            Error::NotFound
        } else {
            e
        })
    }

    pub fn list_lobbies(&self) -> Result<Vec<LobbyRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, host_id, name, listening_mode, created_at, last_activity FROM lobbies",
            )?;
            let rows = stmt.query_map([], row_to_lobby)?;
            rows.collect()
        })
    }

    pub fn is_name_taken(&self, name: &str, exclude_id: Option<&str>) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM lobbies WHERE LOWER(name) = LOWER(?1) AND id != ?2",
                params![name, exclude_id.unwrap_or("")],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn rename_lobby(&self, id: &str, name: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE lobbies SET name = ?1 WHERE id = ?2",
                params![name, id],
            )?;
            Ok(())
        })
    }

    pub fn touch_lobby_activity(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE lobbies SET last_activity = ?1 WHERE id = ?2",
                params![Utc::now(), id],
            )?;
            Ok(())
        })
    }

    pub fn delete_lobby(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM lobbies WHERE id = ?1", params![id])?;
            Ok(())
        })
    }

    /// Lobbies idle (no activity) for longer than `max_idle_secs` — cleanup
    /// sweep candidates. The caller is still responsible for checking that
    /// the lobby is empty before deleting it; membership is in-memory only.
    pub fn idle_lobby_ids(&self, max_idle_secs: i64) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let cutoff = Utc::now() - chrono::Duration::seconds(max_idle_secs);
            let mut stmt = conn.prepare("SELECT id FROM lobbies WHERE last_activity < ?1")?;
            let rows = stmt
                .query_map(params![cutoff], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn lobby_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM lobbies WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn get_lobby_optional(&self, id: &str) -> Result<Option<LobbyRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, host_id, name, listening_mode, created_at, last_activity
                 FROM lobbies WHERE id = ?1",
                params![id],
                row_to_lobby,
            )
            .optional()
        })
    }
}
