use clstore::SongStatus;
use serde::Serialize;

/// Progress/status event emitted at least on every status change and on
/// measurable download progress. The realtime gateway subscribes to these
/// and routes them to the relevant lobby room.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadEvent {
    pub url: String,
    pub song_id: String,
    pub status: SongStatus,
    pub percent: Option<f32>,
    pub error: Option<String>,
    pub lobby_id: Option<String>,
}
