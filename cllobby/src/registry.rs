//! Component F: lobby/user lifecycle, naming, and the idle-eviction sweep.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use clstore::{ListeningMode, LobbyRow, PlaybackStateRow, Store};
use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

use crate::chat::{ChatHistory, RateLimiter};
use crate::lobby::{LobbyHandle, LobbyState};
use crate::playback::PlaybackState;
use crate::queue::Queue;
use crate::song::Song;
use crate::user::User;

pub const LOBBY_ID_LEN: usize = 8;
pub const MAX_LOBBY_NAME_LEN: usize = 50;
pub const IDLE_EVICTION_SECS: i64 = 24 * 3600;
pub const CLEANUP_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum Error {
    #[error("lobby not found")]
    NotFound,
    #[error("a lobby named '{0}' already exists")]
    NameTaken(String),
    #[error("lobby name must be 1-50 characters")]
    InvalidName,
    #[error(transparent)]
    Store(#[from] clstore::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub struct LobbyRegistry {
    store: Store,
    lobbies: RwLock<HashMap<String, Arc<LobbyHandle>>>,
}

impl LobbyRegistry {
    pub fn new(store: Store) -> Arc<Self> {
        Arc::new(Self {
            store,
            lobbies: RwLock::new(HashMap::new()),
        })
    }

    /// Creates a lobby, optionally with a caller-supplied id and/or name.
    /// Name uniqueness is case-insensitive across live lobbies.
    pub fn create_lobby(
        &self,
        host_id: Option<String>,
        custom_id: Option<String>,
        mode: ListeningMode,
        name: Option<String>,
    ) -> Result<Arc<LobbyHandle>> {
        if let Some(name) = &name {
            self.validate_name(name, None)?;
        }

        let id = custom_id.unwrap_or_else(generate_lobby_id);
        let now = Utc::now();
        let row = LobbyRow {
            id: id.clone(),
            host_id: host_id.clone(),
            name: name.clone(),
            listening_mode: mode,
            created_at: now,
            last_activity: now,
        };

        if let Err(e) = self.store.insert_lobby(&row) {
            warn!(lobby_id = %id, "failed to persist new lobby: {e}");
        }

        let state = LobbyState {
            id: id.clone(),
            name,
            host_id,
            listening_mode: mode,
            created_at: now,
            last_activity: now,
            users: HashMap::new(),
            queue: Queue::new(),
            playback: PlaybackState::default(),
            chat: ChatHistory::default(),
            rate_limiter: RateLimiter::default(),
        };
        let handle = LobbyHandle::new(state, self.store.clone());
        self.lobbies.write().unwrap().insert(id, handle.clone());
        Ok(handle)
    }

    /// Looks a lobby up in memory, falling back to the persistence store on
    /// miss and rehydrating its queue + playback state.
    pub fn get_lobby(&self, id: &str) -> Option<Arc<LobbyHandle>> {
        if let Some(handle) = self.lobbies.read().unwrap().get(id).cloned() {
            return Some(handle);
        }
        self.load_from_db(id)
    }

    fn load_from_db(&self, id: &str) -> Option<Arc<LobbyHandle>> {
        let row = self.store.get_lobby_optional(id).ok().flatten()?;
        let song_rows = self.store.list_queue_songs(id).unwrap_or_default();
        let songs: Vec<Song> = song_rows.into_iter().map(Song::from_row).collect();
        let queue = Queue::from_songs(songs.clone());

        let playback = match self.store.load_playback_state(id) {
            Ok(Some(playback_row)) => PlaybackState::from_row(
                playback_row.clone(),
                resolve_current_track(&playback_row, &songs),
            ),
            _ => PlaybackState::default(),
        };

        let chat_rows = self.store.recent_chat_messages(id, 100).unwrap_or_default();
        let mut chat = ChatHistory::default();
        chat.reload(
            chat_rows
                .into_iter()
                .map(|r| crate::chat::ChatMessage {
                    id: r.id,
                    lobby_id: r.lobby_id,
                    user_id: r.user_id,
                    username: r.username,
                    emoji: r.emoji,
                    content: r.content,
                    timestamp: r.created_at,
                })
                .collect(),
        );

        let state = LobbyState {
            id: row.id.clone(),
            name: row.name.clone(),
            host_id: row.host_id.clone(),
            listening_mode: row.listening_mode,
            created_at: row.created_at,
            last_activity: row.last_activity,
            users: HashMap::new(),
            queue,
            playback,
            chat,
            rate_limiter: RateLimiter::default(),
        };
        let handle = LobbyHandle::new(state, self.store.clone());
        self.lobbies.write().unwrap().insert(row.id, handle.clone());
        Some(handle)
    }

    pub fn join_lobby(&self, id: &str, user: User) -> Arc<LobbyHandle> {
        let handle = self
            .get_lobby(id)
            .unwrap_or_else(|| {
                // `lobby:join` may create the lobby if it doesn't exist.
                self.create_lobby(None, Some(id.to_string()), ListeningMode::Synchronized, None)
                    .expect("custom-id lobby creation cannot fail on name validation")
            });
        handle.add_user(user);
        handle
    }

    pub fn leave_lobby(&self, id: &str, conn_id: &str) {
        if let Some(handle) = self.lobbies.read().unwrap().get(id).cloned() {
            handle.remove_user(conn_id);
        }
    }

    pub fn rename_lobby(&self, id: &str, name: Option<String>) -> Result<()> {
        if let Some(name) = &name {
            self.validate_name(name, Some(id))?;
        }
        let handle = self.get_lobby(id).ok_or(Error::NotFound)?;
        handle.rename(name);
        Ok(())
    }

    fn validate_name(&self, name: &str, exclude_id: Option<&str>) -> Result<()> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_LOBBY_NAME_LEN {
            return Err(Error::InvalidName);
        }
        if self.is_name_taken(trimmed, exclude_id) {
            return Err(Error::NameTaken(trimmed.to_string()));
        }
        Ok(())
    }

    pub fn is_name_taken(&self, name: &str, exclude_id: Option<&str>) -> bool {
        let lower = name.to_lowercase();
        let in_memory = self.lobbies.read().unwrap().values().any(|h| {
            Some(h.id().as_str()) != exclude_id
                && h.name()
                    .is_some_and(|n| n.to_lowercase() == lower)
        });
        if in_memory {
            return true;
        }
        self.store
            .is_name_taken(name, exclude_id)
            .unwrap_or(false)
    }

    pub fn get_all_lobbies(&self) -> Vec<Arc<LobbyHandle>> {
        self.lobbies.read().unwrap().values().cloned().collect()
    }

    pub fn delete_lobby(&self, id: &str) {
        self.lobbies.write().unwrap().remove(id);
        if let Err(e) = self.store.delete_lobby(id) {
            warn!(lobby_id = id, "failed to delete lobby from store: {e}");
        }
    }

    /// Eviction rule: empty + idle past the threshold. Runs on the 60s
    /// cleanup timer; the `users.is_empty()` guard must never fire for a
    /// lobby with members.
    pub fn cleanup_empty_lobbies(&self) {
        let now = Utc::now();
        let candidates: Vec<String> = self
            .lobbies
            .read()
            .unwrap()
            .values()
            .filter(|h| {
                h.is_empty()
                    && (now - h.last_activity()).num_seconds() > IDLE_EVICTION_SECS
            })
            .map(|h| h.id())
            .collect();

        for id in candidates {
            info!(lobby_id = %id, "evicting empty, idle lobby");
            self.delete_lobby(&id);
        }
    }

    /// Spawns the 60s cleanup timer, cancelable by dropping the returned
    /// handle.
    pub fn spawn_cleanup_sweep(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                this.cleanup_empty_lobbies();
            }
        })
    }
}

fn resolve_current_track(row: &PlaybackStateRow, songs: &[Song]) -> Option<Song> {
    let snapshot: Song = row
        .current_track
        .as_ref()
        .and_then(|v| serde_json::from_value(v.clone()).ok())?;
    songs
        .iter()
        .find(|s| s.id == snapshot.id)
        .cloned()
        .or(Some(snapshot))
}

fn generate_lobby_id() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..LOBBY_ID_LEN)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::User;

    fn registry() -> Arc<LobbyRegistry> {
        LobbyRegistry::new(Store::open_in_memory().unwrap())
    }

    #[test]
    fn create_and_get_lobby_round_trips() {
        let registry = registry();
        let handle = registry
            .create_lobby(None, Some("L1".into()), ListeningMode::Synchronized, None)
            .unwrap();
        assert_eq!(handle.id(), "L1");
        assert!(registry.get_lobby("L1").is_some());
    }

    #[test]
    fn duplicate_name_is_rejected_case_insensitively() {
        let registry = registry();
        registry
            .create_lobby(None, None, ListeningMode::Synchronized, Some("Chill Beats".into()))
            .unwrap();
        let err = registry
            .create_lobby(None, None, ListeningMode::Synchronized, Some("chill beats".into()))
            .unwrap_err();
        assert!(matches!(err, Error::NameTaken(_)));
    }

    #[test]
    fn join_creates_lobby_when_missing() {
        let registry = registry();
        assert!(registry.get_lobby("L2").is_none());
        let handle = registry.join_lobby("L2", User::new("conn1", "Alice".into(), None));
        assert_eq!(handle.id(), "L2");
        assert_eq!(handle.user_count(), 1);
    }

    #[test]
    fn fresh_empty_lobby_is_not_evicted_before_the_idle_threshold() {
        let registry = registry();
        registry
            .create_lobby(None, Some("L3".into()), ListeningMode::Synchronized, None)
            .unwrap();
        registry.cleanup_empty_lobbies();
        assert!(
            registry.get_lobby("L3").is_some(),
            "a lobby created moments ago hasn't cleared the 24h idle threshold"
        );
    }

    #[test]
    fn nonempty_lobby_is_never_evicted() {
        let registry = registry();
        let handle = registry
            .create_lobby(None, Some("L4".into()), ListeningMode::Synchronized, None)
            .unwrap();
        handle.add_user(User::new("conn1", "Alice".into(), None));
        registry.cleanup_empty_lobbies();
        assert!(registry.get_lobby("L4").is_some());
    }
}
