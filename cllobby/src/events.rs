//! Events a [`crate::lobby::LobbyHandle`] emits for the realtime gateway to
//! translate into wire messages. Kept as plain data here — translating an
//! event into a named websocket frame, and deciding broadcast-vs-unicast, is
//! the gateway's job, not this crate's.

use chrono::{DateTime, Utc};
use clstore::RepeatMode;
use serde::Serialize;

use crate::chat::ChatMessage;
use crate::song::Song;
use crate::user::User;

#[derive(Debug, Clone, Serialize)]
pub struct SyncPayload {
    pub lobby_id: String,
    pub track: Option<Song>,
    pub position: f64,
    pub is_playing: bool,
    pub repeat_mode: RepeatMode,
    pub server_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum LobbyEvent {
    QueueUpdated {
        lobby_id: String,
        songs: Vec<Song>,
    },
    /// Broadcast sync, per the periodic loop or any state-mutating playback
    /// op — suppressed entirely for independent-mode lobbies.
    PlaybackSync(SyncPayload),
    /// Unicast force-sync in response to `playback:reportPosition`
    /// drift beyond [`crate::playback::DRIFT_THRESHOLD_SECS`].
    ForceSync {
        to_conn_id: String,
        payload: SyncPayload,
    },
    TrackEnded {
        lobby_id: String,
        ended_track: Option<Song>,
        repeat_mode: RepeatMode,
    },
    ShuffleChanged {
        lobby_id: String,
        shuffle_enabled: bool,
    },
    UserJoined {
        lobby_id: String,
        user: User,
    },
    UserLeft {
        lobby_id: String,
        conn_id: String,
    },
    UsersUpdated {
        lobby_id: String,
        users: Vec<User>,
    },
    ModeChanged {
        lobby_id: String,
        conn_id: String,
        mode: crate::user::UserMode,
    },
    LobbyRenamed {
        lobby_id: String,
        name: Option<String>,
    },
    /// Emitted once, right before a lobby is torn down by the idle sweep,
    /// so the Gateway can tell any still-connected (but unrecorded) sockets
    /// to disconnect gracefully.
    LobbyClosed {
        lobby_id: String,
        message: String,
    },
    Chat {
        lobby_id: String,
        message: ChatMessage,
    },
}
