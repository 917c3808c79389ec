//! Wire framing and payload shapes for the client <-> server realtime
//! protocol (§6): one JSON text frame per event, shaped
//! `{"event": "<name>", "data": {...}}` — a flat envelope rather than
//! socket.io-style implicit multiplexing, since axum's websocket is a plain
//! frame pipe and the router dispatches on `event` itself.

use chrono::{DateTime, Utc};
use cllobby::{ChatMessage, ListeningMode, RepeatMode, Song, SyncPayload, User, UserMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Builds an outbound `{"event":..,"data":..}` frame.
pub fn encode(event: &str, data: impl Serialize) -> String {
    serde_json::json!({ "event": event, "data": data }).to_string()
}

/// A handful of events carry a bare lobby id string as their payload rather
/// than `{lobbyId: ...}` (`queue:get`, `queue:next`, `playback:getState`,
/// `playback:getShuffleState`) — accept either shape.
pub fn lobby_id_of(data: &Value) -> Option<String> {
    match data {
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => data.get("lobbyId").and_then(|v| v.as_str()).map(str::to_string),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyCreate {
    pub username: String,
    pub emoji: Option<String>,
    pub listening_mode: Option<ListeningMode>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyJoin {
    pub lobby_id: String,
    pub username: String,
    pub emoji: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyLeave {
    pub lobby_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyRename {
    pub lobby_id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeSet {
    pub lobby_id: Option<String>,
    pub mode: UserMode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub lobby_id: Option<String>,
    pub username: Option<String>,
    /// Present-and-null clears the emoji; absent leaves it unchanged. The
    /// wire format can't distinguish "absent" from "explicit null" without a
    /// custom deserializer, so this thin adapter treats both as "unchanged" —
    /// clearing an emoji back to none happens by sending an empty string.
    pub emoji: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueAdd {
    pub lobby_id: String,
    pub query: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub added_by: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistAddMode {
    Single,
    All,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePlaylistAdd {
    pub lobby_id: String,
    pub url: String,
    pub mode: PlaylistAddMode,
    pub added_by: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRemove {
    pub lobby_id: String,
    pub song_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueReorder {
    pub lobby_id: String,
    pub song_id: String,
    pub new_index: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyScoped {
    pub lobby_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackEnded {
    pub lobby_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInput {
    pub url: String,
    pub title: String,
    pub duration: f64,
    pub added_by: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackPlay {
    pub lobby_id: String,
    pub track: Option<TrackInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSeek {
    pub lobby_id: String,
    pub position: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSetRepeat {
    pub lobby_id: String,
    pub mode: RepeatMode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackShuffle {
    pub lobby_id: String,
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackReportPosition {
    pub lobby_id: String,
    pub client_position: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSend {
    pub lobby_id: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistory {
    pub lobby_id: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyErrorPayload {
    pub message: String,
}

pub fn lobby_error(message: impl Into<String>) -> String {
    encode("lobby:error", LobbyErrorPayload { message: message.into() })
}

// ---- Outbound DTOs ---------------------------------------------------
//
// cllobby's domain types (`Song`, `User`, `ChatMessage`) serialize their
// fields in snake_case, since they're also the shape persisted to SQLite.
// The wire protocol (§6) uses camelCase throughout, so the gateway — not
// cllobby — owns the translation, matching cllobby's own framing that
// "deciding broadcast-vs-unicast... is the gateway's job".

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongDto {
    pub id: String,
    pub url: String,
    pub title: String,
    pub duration: f64,
    pub added_by: Option<String>,
    pub thumbnail: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl From<&Song> for SongDto {
    fn from(s: &Song) -> Self {
        Self {
            id: s.id.clone(),
            url: s.url.clone(),
            title: s.title.clone(),
            duration: s.duration,
            added_by: s.added_by.clone(),
            thumbnail: s.thumbnail.clone(),
            added_at: s.added_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub conn_id: String,
    pub username: String,
    pub emoji: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub mode: UserMode,
}

impl From<&User> for UserDto {
    fn from(u: &User) -> Self {
        Self {
            conn_id: u.conn_id.clone(),
            username: u.username.clone(),
            emoji: u.emoji.clone(),
            joined_at: u.joined_at,
            mode: u.mode,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageDto {
    pub id: String,
    pub lobby_id: String,
    pub user_id: String,
    pub username: String,
    pub emoji: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&ChatMessage> for ChatMessageDto {
    fn from(m: &ChatMessage) -> Self {
        Self {
            id: m.id.clone(),
            lobby_id: m.lobby_id.clone(),
            user_id: m.user_id.clone(),
            username: m.username.clone(),
            emoji: m.emoji.clone(),
            content: m.content.clone(),
            timestamp: m.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDto {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub lobby_id: String,
    pub track: Option<SongDto>,
    pub position: f64,
    pub is_playing: bool,
    pub repeat_mode: RepeatMode,
    pub server_time: DateTime<Utc>,
}

impl From<&SyncPayload> for SyncDto {
    fn from(p: &SyncPayload) -> Self {
        Self {
            kind: "sync",
            lobby_id: p.lobby_id.clone(),
            track: p.track.as_ref().map(SongDto::from),
            position: p.position,
            is_playing: p.is_playing,
            repeat_mode: p.repeat_mode,
            server_time: p.server_time,
        }
    }
}
