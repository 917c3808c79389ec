//! Lobby lifecycle, the song queue, the playback state machine, membership,
//! and chat — components D through H, bundled into one
//! crate because they share the same per-lobby lock and event stream.
//!
//! Grounded in `pmoplaylist::manager`'s singleton-registry-plus-broadcast
//! pattern, adapted to a per-lobby actor per the concurrency note in
//! [`lobby`]'s module docs: one registry (`LobbyRegistry`) owns many lobbies,
//! each an independently lockable [`LobbyHandle`].

mod chat;
mod events;
mod lobby;
mod playback;
mod queue;
mod registry;
mod song;
mod user;

pub use chat::{ChatHistory, ChatMessage, RateLimiter, HISTORY_CAPACITY, MAX_CONTENT_LEN};
pub use events::{LobbyEvent, SyncPayload};
pub use lobby::{ChatSendError, LobbyHandle, LobbyState};
pub use playback::{PlaybackState, TrackEndedOutcome, DRIFT_THRESHOLD_SECS, SYNC_INTERVAL_MS};
pub use queue::Queue;
pub use registry::{Error, LobbyRegistry, Result, IDLE_EVICTION_SECS, MAX_LOBBY_NAME_LEN};
pub use song::{NewSong, Song};
pub use user::{User, UserMode, MAX_USERNAME_LEN};

pub use clstore::{ListeningMode, RepeatMode};
