use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::{CachedSongRow, Result, SongStatus, Store};

fn row_to_song(row: &rusqlite::Row) -> rusqlite::Result<CachedSongRow> {
    let status: String = row.get("status")?;
    Ok(CachedSongRow {
        id: row.get("id")?,
        url: row.get("url")?,
        title: row.get("title")?,
        duration: row.get("duration")?,
        file_path: row.get("file_path")?,
        thumbnail_url: row.get("thumbnail_url")?,
        status: status.parse().unwrap_or(SongStatus::Error),
        error_message: row.get("error_message")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl Store {
    /// Atomically resolves the cached-song row for `url`: returns the
    /// existing row if one exists, otherwise inserts `new_row` (whose `url`
    /// must equal `url`) and returns it. Both the lookup and the insert run
    /// under the same connection-lock critical section, so two concurrent
    /// callers racing on the same url converge on one row — the dedup
    /// contract in §4.B — rather than tripping the `songs.url` unique
    /// constraint.
    pub fn get_or_insert_pending_song(
        &self,
        url: &str,
        new_row: &CachedSongRow,
    ) -> Result<(CachedSongRow, bool)> {
        self.with_conn(|conn| {
            if let Some(existing) = conn
                .query_row(
                    "SELECT id, url, title, duration, file_path, thumbnail_url, status,
                            error_message, created_at, updated_at
                     FROM songs WHERE url = ?1",
                    params![url],
                    row_to_song,
                )
                .optional()?
            {
                return Ok((existing, false));
            }

            conn.execute(
                "INSERT INTO songs
                    (id, url, title, duration, file_path, thumbnail_url, status,
                     error_message, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    new_row.id,
                    new_row.url,
                    new_row.title,
                    new_row.duration,
                    new_row.file_path,
                    new_row.thumbnail_url,
                    new_row.status.as_str(),
                    new_row.error_message,
                    new_row.created_at,
                    new_row.updated_at,
                ],
            )?;
            Ok((new_row.clone(), true))
        })
    }

    pub fn get_cached_song_by_url(&self, url: &str) -> Result<Option<CachedSongRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, url, title, duration, file_path, thumbnail_url, status,
                        error_message, created_at, updated_at
                 FROM songs WHERE url = ?1",
                params![url],
                row_to_song,
            )
            .optional()
        })
    }

    pub fn get_cached_song(&self, id: &str) -> Result<Option<CachedSongRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, url, title, duration, file_path, thumbnail_url, status,
                        error_message, created_at, updated_at
                 FROM songs WHERE id = ?1",
                params![id],
                row_to_song,
            )
            .optional()
        })
    }

    /// Resets an existing row back to `pending` (used when a prior attempt
    /// errored or its file went missing) so the pipeline can restart it.
    pub fn reset_song_to_pending(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE songs SET status = 'pending', error_message = NULL,
                    file_path = NULL, updated_at = ?1 WHERE id = ?2",
                params![Utc::now(), id],
            )?;
            Ok(())
        })
    }

    pub fn set_song_downloading(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE songs SET status = 'downloading', updated_at = ?1 WHERE id = ?2",
                params![Utc::now(), id],
            )?;
            Ok(())
        })
    }

    pub fn set_song_ready(&self, id: &str, file_path: &str, duration: Option<f64>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE songs SET status = 'ready', file_path = ?1, duration = COALESCE(?2, duration),
                    error_message = NULL, updated_at = ?3 WHERE id = ?4",
                params![file_path, duration, Utc::now(), id],
            )?;
            Ok(())
        })
    }

    pub fn set_song_error(&self, id: &str, message: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE songs SET status = 'error', error_message = ?1, file_path = NULL,
                    updated_at = ?2 WHERE id = ?3",
                params![message, Utc::now(), id],
            )?;
            Ok(())
        })
    }

    pub fn delete_song(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM songs WHERE id = ?1", params![id])?;
            Ok(())
        })
    }

    pub fn delete_all_songs(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM songs", [])?;
            Ok(())
        })
    }

    pub fn get_all_songs(&self) -> Result<Vec<CachedSongRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, url, title, duration, file_path, thumbnail_url, status,
                        error_message, created_at, updated_at FROM songs",
            )?;
            let rows = stmt.query_map([], row_to_song)?;
            rows.collect()
        })
    }

    /// Rows older than the cutoff, along with their file paths so the caller
    /// can unlink the on-disk files before deleting the rows.
    pub fn songs_older_than(&self, max_age_secs: i64) -> Result<Vec<CachedSongRow>> {
        self.with_conn(|conn| {
            let cutoff = Utc::now() - chrono::Duration::seconds(max_age_secs);
            let mut stmt = conn.prepare(
                "SELECT id, url, title, duration, file_path, thumbnail_url, status,
                        error_message, created_at, updated_at
                 FROM songs WHERE updated_at < ?1",
            )?;
            let rows = stmt.query_map(params![cutoff], row_to_song)?;
            rows.collect()
        })
    }
}
