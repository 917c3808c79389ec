use rusqlite::params;

use crate::{QueueSongRow, Result, Store};

fn row_to_song(row: &rusqlite::Row) -> rusqlite::Result<QueueSongRow> {
    Ok(QueueSongRow {
        id: row.get("id")?,
        lobby_id: row.get("lobby_id")?,
        url: row.get("url")?,
        title: row.get("title")?,
        duration: row.get("duration")?,
        added_by: row.get("added_by")?,
        thumbnail: row.get("thumbnail")?,
        added_at: row.get("added_at")?,
        sort_order: row.get("sort_order")?,
    })
}

impl Store {
    pub fn insert_queue_song(&self, song: &QueueSongRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO queue_songs
                    (id, lobby_id, url, title, duration, added_by, thumbnail, added_at, sort_order)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    song.id,
                    song.lobby_id,
                    song.url,
                    song.title,
                    song.duration,
                    song.added_by,
                    song.thumbnail,
                    song.added_at,
                    song.sort_order,
                ],
            )?;
            Ok(())
        })
    }

    pub fn remove_queue_song(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM queue_songs WHERE id = ?1", params![id])?;
            Ok(())
        })
    }

    pub fn list_queue_songs(&self, lobby_id: &str) -> Result<Vec<QueueSongRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, lobby_id, url, title, duration, added_by, thumbnail, added_at, sort_order
                 FROM queue_songs WHERE lobby_id = ?1 ORDER BY sort_order ASC",
            )?;
            let rows = stmt.query_map(params![lobby_id], row_to_song)?;
            rows.collect()
        })
    }

    /// Rewrites every song's `sort_order` for a lobby in one transaction, so
    /// a reorder never leaves a transiently-duplicated sort order visible to
    /// another reader.
    pub fn replace_sort_orders(&self, lobby_id: &str, ordered_ids: &[String]) -> Result<()> {
        self.with_tx(|tx| {
            for (idx, id) in ordered_ids.iter().enumerate() {
                tx.execute(
                    "UPDATE queue_songs SET sort_order = ?1 WHERE id = ?2 AND lobby_id = ?3",
                    params![idx as i64, id, lobby_id],
                )?;
            }
            Ok(())
        })
    }
}
