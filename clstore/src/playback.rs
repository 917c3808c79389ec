use rusqlite::{params, OptionalExtension};

use crate::{PlaybackStateRow, RepeatMode, Result, Store};

fn row_to_playback(row: &rusqlite::Row) -> rusqlite::Result<PlaybackStateRow> {
    let current_track: Option<String> = row.get("current_track")?;
    let shuffled_indices: Option<String> = row.get("shuffled_indices")?;
    let repeat_mode: String = row.get("repeat_mode")?;
    Ok(PlaybackStateRow {
        lobby_id: row.get("lobby_id")?,
        current_track: current_track.and_then(|s| serde_json::from_str(&s).ok()),
        position: row.get("position")?,
        is_playing: row.get::<_, i64>("is_playing")? != 0,
        started_at: row.get("started_at")?,
        shuffle_enabled: row.get::<_, i64>("shuffle_enabled")? != 0,
        shuffled_indices: shuffled_indices
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default(),
        shuffle_index: row.get("shuffle_index")?,
        repeat_mode: repeat_mode.parse().unwrap_or(RepeatMode::Off),
    })
}

impl Store {
    /// Inserts or replaces the playback row for a lobby — playback state is
    /// a singleton per lobby, so every mutation is a full UPSERT.
    pub fn upsert_playback_state(&self, state: &PlaybackStateRow) -> Result<()> {
        self.with_conn(|conn| {
            let current_track = state
                .current_track
                .as_ref()
                .map(|v| v.to_string());
            let shuffled_indices = serde_json::to_string(&state.shuffled_indices).unwrap();
            conn.execute(
                "INSERT INTO playback_state
                    (lobby_id, current_track, position, is_playing, started_at,
                     shuffle_enabled, shuffled_indices, shuffle_index, repeat_mode)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(lobby_id) DO UPDATE SET
                    current_track = excluded.current_track,
                    position = excluded.position,
                    is_playing = excluded.is_playing,
                    started_at = excluded.started_at,
                    shuffle_enabled = excluded.shuffle_enabled,
                    shuffled_indices = excluded.shuffled_indices,
                    shuffle_index = excluded.shuffle_index,
                    repeat_mode = excluded.repeat_mode",
                params![
                    state.lobby_id,
                    current_track,
                    state.position,
                    state.is_playing as i64,
                    state.started_at,
                    state.shuffle_enabled as i64,
                    shuffled_indices,
                    state.shuffle_index,
                    state.repeat_mode.as_str(),
                ],
            )?;
            Ok(())
        })
    }

    /// Restores playback state on cold start, forcing `is_playing = false`
    /// per §4.E so a restart never leaves a phantom playhead advancing.
    pub fn load_playback_state(&self, lobby_id: &str) -> Result<Option<PlaybackStateRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT lobby_id, current_track, position, is_playing, started_at,
                            shuffle_enabled, shuffled_indices, shuffle_index, repeat_mode
                     FROM playback_state WHERE lobby_id = ?1",
                    params![lobby_id],
                    row_to_playback,
                )
                .optional()?;
            Ok(row.map(|mut s| {
                s.is_playing = false;
                s.started_at = None;
                s
            }))
        })
    }
}
