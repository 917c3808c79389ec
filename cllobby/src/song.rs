use chrono::{DateTime, Utc};
use clstore::QueueSongRow;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A queue entry (§3 "Song"). `sort_order` is implicit: a song's position
/// in a [`crate::queue::Queue`]'s vector *is* its sort order, so this type
/// carries only what's persisted alongside that position.
///
/// Also round-trips through JSON: `PlaybackState::to_row`/`from_row` stashes
/// the current track as a snapshot inside `playback_state.current_track`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub url: String,
    pub title: String,
    pub duration: f64,
    pub added_by: Option<String>,
    pub thumbnail: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// Fields a caller supplies to add a song; the id and timestamp are
/// generated by the queue engine itself.
#[derive(Debug, Clone)]
pub struct NewSong {
    pub url: String,
    pub title: String,
    pub duration: f64,
    pub added_by: Option<String>,
    pub thumbnail: Option<String>,
}

impl Song {
    pub fn new(fields: NewSong) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url: fields.url,
            title: fields.title,
            duration: fields.duration,
            added_by: fields.added_by,
            thumbnail: fields.thumbnail,
            added_at: Utc::now(),
        }
    }

    pub fn to_row(&self, lobby_id: &str, sort_order: i64) -> QueueSongRow {
        QueueSongRow {
            id: self.id.clone(),
            lobby_id: lobby_id.to_string(),
            url: self.url.clone(),
            title: self.title.clone(),
            duration: self.duration,
            added_by: self.added_by.clone(),
            thumbnail: self.thumbnail.clone(),
            added_at: self.added_at,
            sort_order,
        }
    }

    pub fn from_row(row: QueueSongRow) -> Self {
        Self {
            id: row.id,
            url: row.url,
            title: row.title,
            duration: row.duration,
            added_by: row.added_by,
            thumbnail: row.thumbnail,
            added_at: row.added_at,
        }
    }
}
