use rusqlite::{params, OptionalExtension};

use crate::{PlaylistRow, PlaylistSongRow, Result, Store};

fn row_to_playlist(row: &rusqlite::Row) -> rusqlite::Result<PlaylistRow> {
    Ok(PlaylistRow {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_playlist_song(row: &rusqlite::Row) -> rusqlite::Result<PlaylistSongRow> {
    Ok(PlaylistSongRow {
        id: row.get("id")?,
        playlist_id: row.get("playlist_id")?,
        url: row.get("url")?,
        title: row.get("title")?,
        duration: row.get("duration")?,
        thumbnail: row.get("thumbnail")?,
        sort_order: row.get("sort_order")?,
        added_at: row.get("added_at")?,
    })
}

impl Store {
    pub fn insert_playlist(&self, playlist: &PlaylistRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO playlists (id, user_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![playlist.id, playlist.user_id, playlist.name, playlist.created_at],
            )?;
            Ok(())
        })
    }

    pub fn get_playlist(&self, id: &str) -> Result<Option<PlaylistRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_id, name, created_at FROM playlists WHERE id = ?1",
                params![id],
                row_to_playlist,
            )
            .optional()
        })
    }

    pub fn list_playlists(&self, user_id: &str) -> Result<Vec<PlaylistRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, created_at FROM playlists WHERE user_id = ?1",
            )?;
            let rows = stmt.query_map(params![user_id], row_to_playlist)?;
            rows.collect()
        })
    }

    pub fn rename_playlist(&self, id: &str, name: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE playlists SET name = ?1 WHERE id = ?2",
                params![name, id],
            )?;
            Ok(())
        })
    }

    pub fn delete_playlist(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM playlists WHERE id = ?1", params![id])?;
            Ok(())
        })
    }

    pub fn add_playlist_song(&self, song: &PlaylistSongRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO playlist_songs
                    (id, playlist_id, url, title, duration, thumbnail, sort_order, added_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    song.id,
                    song.playlist_id,
                    song.url,
                    song.title,
                    song.duration,
                    song.thumbnail,
                    song.sort_order,
                    song.added_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn remove_playlist_song(&self, playlist_id: &str, song_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM playlist_songs WHERE id = ?1 AND playlist_id = ?2",
                params![song_id, playlist_id],
            )?;
            Ok(())
        })
    }

    pub fn list_playlist_songs(&self, playlist_id: &str) -> Result<Vec<PlaylistSongRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, playlist_id, url, title, duration, thumbnail, sort_order, added_at
                 FROM playlist_songs WHERE playlist_id = ?1 ORDER BY sort_order ASC",
            )?;
            let rows = stmt.query_map(params![playlist_id], row_to_playlist_song)?;
            rows.collect()
        })
    }

    /// Reorders a playlist's songs inside one transaction, keeping
    /// `sort_order` dense the same way `replace_sort_orders` does for queues.
    pub fn reorder_playlist_songs(&self, playlist_id: &str, ordered_ids: &[String]) -> Result<()> {
        self.with_tx(|tx| {
            for (idx, id) in ordered_ids.iter().enumerate() {
                tx.execute(
                    "UPDATE playlist_songs SET sort_order = ?1 WHERE id = ?2 AND playlist_id = ?3",
                    params![idx as i64, id, playlist_id],
                )?;
            }
            Ok(())
        })
    }
}
