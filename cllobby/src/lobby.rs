//! A single lobby's state and the handle wrapping it.
//!
//! Concurrency follows the per-lobby mutex option: one [`std::sync::Mutex`]
//! over all of a lobby's mutable state (queue, playback, users, chat), taken
//! briefly per operation. I/O — persistence writes, the broadcast to the
//! gateway — happens after the lock is released: compute under lock,
//! release, then I/O. Persistence writes are genuinely fire-and-forget:
//! failures are logged, never surfaced to the caller.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use clstore::{ListeningMode, LobbyRow, RepeatMode, Store};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::chat::{ChatHistory, ChatMessage, RateLimiter};
use crate::events::{LobbyEvent, SyncPayload};
use crate::playback::{PlaybackState, TrackEndedOutcome, DRIFT_THRESHOLD_SECS, SYNC_INTERVAL_MS};
use crate::queue::Queue;
use crate::song::{NewSong, Song};
use crate::user::{User, UserMode};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// `chat:send` outcomes. Throttled sends are rejected entirely, never queued
/// or delayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatSendError {
    Throttled,
}

pub struct LobbyState {
    pub id: String,
    pub name: Option<String>,
    pub host_id: Option<String>,
    pub listening_mode: ListeningMode,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub users: std::collections::HashMap<String, User>,
    pub queue: Queue,
    pub playback: PlaybackState,
    pub chat: ChatHistory,
    pub rate_limiter: RateLimiter,
}

impl LobbyState {
    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn to_row(&self) -> LobbyRow {
        LobbyRow {
            id: self.id.clone(),
            host_id: self.host_id.clone(),
            name: self.name.clone(),
            listening_mode: self.listening_mode,
            created_at: self.created_at,
            last_activity: self.last_activity,
        }
    }
}

/// Owns one lobby's state plus its event channel and sync-loop handle.
/// Cheap to clone (an `Arc`); the registry hands out clones to the Gateway.
pub struct LobbyHandle {
    state: Mutex<LobbyState>,
    store: Store,
    events: broadcast::Sender<LobbyEvent>,
    sync_task: Mutex<Option<JoinHandle<()>>>,
}

impl LobbyHandle {
    pub fn new(state: LobbyState, store: Store) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            state: Mutex::new(state),
            store,
            events: tx,
            sync_task: Mutex::new(None),
        })
    }

    pub fn id(&self) -> String {
        self.state.lock().unwrap().id.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LobbyEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: LobbyEvent) {
        let _ = self.events.send(event);
    }

    fn persist_lobby(&self, row: &LobbyRow) {
        if let Err(e) = self.store.touch_lobby_activity(&row.id) {
            warn!(lobby_id = %row.id, "failed to persist lobby activity: {e}");
        }
    }

    fn persist_playback(&self, state: &PlaybackState, lobby_id: &str) {
        if let Err(e) = self.store.upsert_playback_state(&state.to_row(lobby_id)) {
            warn!(lobby_id, "failed to persist playback state: {e}");
        }
    }

    fn persist_sort_orders(&self, lobby_id: &str, ids: &[String]) {
        if let Err(e) = self.store.replace_sort_orders(lobby_id, ids) {
            warn!(lobby_id, "failed to persist queue order: {e}");
        }
    }

    // ---- Membership ----------------------------------------------------

    pub fn snapshot_users(&self) -> Vec<User> {
        self.state.lock().unwrap().users.values().cloned().collect()
    }

    pub fn add_user(&self, user: User) {
        let lobby_id = {
            let mut state = self.state.lock().unwrap();
            state.users.insert(user.conn_id.clone(), user.clone());
            state.touch();
            state.id.clone()
        };
        self.emit(LobbyEvent::UserJoined { lobby_id, user });
    }

    /// Removes a connection's membership and its independent-mode cursor.
    /// Returns `true` if the lobby is now empty (a hint for the registry's
    /// idle-eviction bookkeeping, not an eviction decision itself).
    pub fn remove_user(&self, conn_id: &str) -> bool {
        let (lobby_id, now_empty) = {
            let mut state = self.state.lock().unwrap();
            state.users.remove(conn_id);
            state.queue.remove_user_position(conn_id);
            state.rate_limiter.remove(conn_id);
            state.touch();
            (state.id.clone(), state.users.is_empty())
        };
        self.emit(LobbyEvent::UserLeft {
            lobby_id,
            conn_id: conn_id.to_string(),
        });
        now_empty
    }

    pub fn set_user_mode(&self, conn_id: &str, mode: UserMode) {
        let lobby_id = {
            let mut state = self.state.lock().unwrap();
            if let Some(user) = state.users.get_mut(conn_id) {
                user.mode = mode;
            }
            state.touch();
            state.id.clone()
        };
        self.emit(LobbyEvent::ModeChanged {
            lobby_id,
            conn_id: conn_id.to_string(),
            mode,
        });
    }

    pub fn update_user(&self, conn_id: &str, username: Option<String>, emoji: Option<Option<String>>) {
        let (lobby_id, users) = {
            let mut state = self.state.lock().unwrap();
            if let Some(user) = state.users.get_mut(conn_id) {
                if let Some(username) = username {
                    user.username = crate::user::truncate(username, crate::user::MAX_USERNAME_LEN);
                }
                if let Some(emoji) = emoji {
                    user.emoji = emoji;
                }
            }
            state.touch();
            (state.id.clone(), state.users.values().cloned().collect())
        };
        self.emit(LobbyEvent::UsersUpdated { lobby_id, users });
    }

    pub fn rename(&self, name: Option<String>) {
        let lobby_id = {
            let mut state = self.state.lock().unwrap();
            state.name = name.clone();
            state.touch();
            state.id.clone()
        };
        self.persist_lobby(&self.state.lock().unwrap().to_row());
        self.emit(LobbyEvent::LobbyRenamed { lobby_id, name });
    }

    pub fn listening_mode(&self) -> ListeningMode {
        self.state.lock().unwrap().listening_mode
    }

    pub fn host_id(&self) -> Option<String> {
        self.state.lock().unwrap().host_id.clone()
    }

    pub fn name(&self) -> Option<String> {
        self.state.lock().unwrap().name.clone()
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().unwrap().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.user_count() == 0
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.state.lock().unwrap().last_activity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.state.lock().unwrap().created_at
    }

    // ---- Queue (component D) -------------------------------------------

    pub fn songs(&self) -> Vec<Song> {
        self.state.lock().unwrap().queue.songs().to_vec()
    }

    pub fn current_song(&self) -> Option<Song> {
        self.state.lock().unwrap().queue.current_song().cloned()
    }

    /// Appends a song at the tail. The returned `bool` is whether the queue
    /// was empty before the add — the gateway uses it to decide whether to
    /// auto-start playback on `queue:add`/`queue:playlist-add`.
    pub fn add_song(&self, fields: NewSong) -> (Song, bool) {
        let (song, lobby_id, ids, row, was_empty) = {
            let mut state = self.state.lock().unwrap();
            let was_empty = state.queue.is_empty();
            let song = state.queue.add_song(Song::new(fields));
            state
                .playback
                .update_shuffle_for_queue_change(state.queue.len());
            state.touch();
            let ids: Vec<String> = state.queue.songs().iter().map(|s| s.id.clone()).collect();
            (song, state.id.clone(), ids, state.to_row(), was_empty)
        };
        if let Err(e) = self.store.insert_queue_song(&song.to_row(&lobby_id, (ids.len() - 1) as i64)) {
            warn!(lobby_id = %lobby_id, "failed to persist queue song: {e}");
        }
        self.persist_lobby(&row);
        self.emit(LobbyEvent::QueueUpdated {
            lobby_id,
            songs: self.songs(),
        });
        (song, was_empty)
    }

    pub fn remove_song(&self, id: &str) -> Option<Song> {
        let (removed, lobby_id, ids) = {
            let mut state = self.state.lock().unwrap();
            let removed = state.queue.remove_song(id);
            state
                .playback
                .update_shuffle_for_queue_change(state.queue.len());
            state.touch();
            let ids: Vec<String> = state.queue.songs().iter().map(|s| s.id.clone()).collect();
            (removed, state.id.clone(), ids)
        };
        if removed.is_some() {
            if let Err(e) = self.store.remove_queue_song(id) {
                warn!(lobby_id = %lobby_id, "failed to delete queue song {id}: {e}");
            }
            self.persist_sort_orders(&lobby_id, &ids);
            self.emit(LobbyEvent::QueueUpdated {
                lobby_id,
                songs: self.songs(),
            });
        }
        removed
    }

    pub fn reorder_song(&self, id: &str, new_index: usize) -> bool {
        let (ok, lobby_id, ids) = {
            let mut state = self.state.lock().unwrap();
            let ok = state.queue.reorder_song(id, new_index);
            state.touch();
            let ids: Vec<String> = state.queue.songs().iter().map(|s| s.id.clone()).collect();
            (ok, state.id.clone(), ids)
        };
        if ok {
            self.persist_sort_orders(&lobby_id, &ids);
            self.emit(LobbyEvent::QueueUpdated {
                lobby_id,
                songs: self.songs(),
            });
        }
        ok
    }

    /// Removes and returns the current head — synchronized-mode
    /// advancement. Does not itself start playback of the new head; the
    /// gateway decides that.
    pub fn advance_queue(&self) -> Option<Song> {
        let (removed, lobby_id, ids) = {
            let mut state = self.state.lock().unwrap();
            let removed = state.queue.advance_queue();
            state
                .playback
                .update_shuffle_for_queue_change(state.queue.len());
            state.touch();
            let ids: Vec<String> = state.queue.songs().iter().map(|s| s.id.clone()).collect();
            (removed, state.id.clone(), ids)
        };
        if let Some(song) = &removed {
            if let Err(e) = self.store.remove_queue_song(&song.id) {
                warn!(lobby_id = %lobby_id, "failed to delete advanced queue song: {e}");
            }
            self.persist_sort_orders(&lobby_id, &ids);
            self.emit(LobbyEvent::QueueUpdated {
                lobby_id,
                songs: self.songs(),
            });
        }
        removed
    }

    pub fn move_current_to_end(&self) {
        let (lobby_id, ids) = {
            let mut state = self.state.lock().unwrap();
            state.queue.move_current_to_end();
            state.touch();
            let ids: Vec<String> = state.queue.songs().iter().map(|s| s.id.clone()).collect();
            (state.id.clone(), ids)
        };
        self.persist_sort_orders(&lobby_id, &ids);
        self.emit(LobbyEvent::QueueUpdated {
            lobby_id,
            songs: self.songs(),
        });
    }

    pub fn advance_user_position(&self, conn_id: &str) -> Option<Song> {
        let mut state = self.state.lock().unwrap();
        state.touch();
        state.queue.advance_user_position(conn_id)
    }

    pub fn set_user_position(&self, conn_id: &str, index: usize) -> bool {
        let mut state = self.state.lock().unwrap();
        state.touch();
        state.queue.set_user_position(conn_id, index)
    }

    pub fn song_at(&self, index: usize) -> Option<Song> {
        self.state.lock().unwrap().queue.song_at(index).cloned()
    }

    pub fn remove_user_position(&self, conn_id: &str) {
        self.state.lock().unwrap().queue.remove_user_position(conn_id);
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    // ---- Chat (component G) ---------------------------------------------

    /// Appends a message, rate-limited at 5 messages / 10s per connection.
    /// Persists iff the store is available; the message still reaches chat
    /// history and the broadcast either way (chat persistence is best-effort,
    /// never a precondition for sending).
    pub fn send_chat(
        &self,
        conn_id: &str,
        user_id: &str,
        username: &str,
        emoji: Option<String>,
        content: &str,
    ) -> Result<ChatMessage, ChatSendError> {
        let (message, lobby_id) = {
            let mut state = self.state.lock().unwrap();
            if state.rate_limiter.is_throttled(conn_id, Utc::now()) {
                return Err(ChatSendError::Throttled);
            }
            let lobby_id = state.id.clone();
            let message = state
                .chat
                .push(&lobby_id, user_id, username, emoji, content);
            state.touch();
            (message, lobby_id)
        };
        if let Err(e) = self.store.insert_chat_message(&to_chat_row(&message)) {
            warn!(lobby_id = %lobby_id, "failed to persist chat message: {e}");
        }
        self.emit(LobbyEvent::Chat {
            lobby_id,
            message: message.clone(),
        });
        Ok(message)
    }

    pub fn chat_history(&self, limit: usize) -> Vec<ChatMessage> {
        self.state.lock().unwrap().chat.recent(limit)
    }

    // ---- Playback (component E) -----------------------------------------

    pub fn playback_snapshot(&self) -> PlaybackState {
        self.state.lock().unwrap().playback.clone()
    }

    fn sync_payload(state: &LobbyState, now: DateTime<Utc>) -> SyncPayload {
        SyncPayload {
            lobby_id: state.id.clone(),
            track: state.playback.current_track.clone(),
            position: state.playback.effective_position(now),
            is_playing: state.playback.is_playing,
            repeat_mode: state.playback.repeat_mode,
            server_time: now,
        }
    }

    /// Broadcasts a `playback:sync` unless the lobby is independent-mode
    /// (sync is suppressed entirely in that mode).
    fn broadcast_sync(&self) {
        let (payload, suppressed) = {
            let state = self.state.lock().unwrap();
            let suppressed = state.listening_mode == ListeningMode::Independent;
            (Self::sync_payload(&state, Utc::now()), suppressed)
        };
        if !suppressed {
            self.emit(LobbyEvent::PlaybackSync(payload));
        }
    }

    pub fn play(self: &Arc<Self>, track: Song) {
        let (lobby_id, row) = {
            let mut state = self.state.lock().unwrap();
            state.playback.play(track, Utc::now());
            state.touch();
            (state.id.clone(), state.to_row())
        };
        self.persist_playback(&self.playback_snapshot(), &lobby_id);
        self.persist_lobby(&row);
        self.broadcast_sync();
        self.ensure_sync_loop_running();
    }

    pub fn pause(&self) {
        let lobby_id = {
            let mut state = self.state.lock().unwrap();
            state.playback.pause(Utc::now());
            state.touch();
            state.id.clone()
        };
        self.persist_playback(&self.playback_snapshot(), &lobby_id);
        self.broadcast_sync();
        self.stop_sync_loop();
    }

    pub fn resume(self: &Arc<Self>) -> bool {
        let (ok, lobby_id) = {
            let mut state = self.state.lock().unwrap();
            let ok = state.playback.resume(Utc::now());
            state.touch();
            (ok, state.id.clone())
        };
        if ok {
            self.persist_playback(&self.playback_snapshot(), &lobby_id);
            self.broadcast_sync();
            self.ensure_sync_loop_running();
        }
        ok
    }

    pub fn seek(&self, pos: f64) {
        let lobby_id = {
            let mut state = self.state.lock().unwrap();
            state.playback.seek(pos, Utc::now());
            state.touch();
            state.id.clone()
        };
        self.persist_playback(&self.playback_snapshot(), &lobby_id);
        self.broadcast_sync();
    }

    pub fn set_track(self: &Arc<Self>, track: Song, auto_play: bool) {
        let lobby_id = {
            let mut state = self.state.lock().unwrap();
            state.playback.set_track(track, auto_play, Utc::now());
            state.touch();
            state.id.clone()
        };
        self.persist_playback(&self.playback_snapshot(), &lobby_id);
        self.broadcast_sync();
        if auto_play {
            self.ensure_sync_loop_running();
        } else {
            self.stop_sync_loop();
        }
    }

    /// Track-ended handling: restarts in place on repeat-one, otherwise
    /// stops and lets the gateway coordinate the queue transition.
    pub fn track_ended(&self) -> TrackEndedOutcome {
        let (outcome, lobby_id, ended_track, repeat_mode) = {
            let mut state = self.state.lock().unwrap();
            let ended_track = state.playback.current_track.clone();
            let outcome = state.playback.track_ended(Utc::now());
            state.touch();
            (outcome, state.id.clone(), ended_track, state.playback.repeat_mode)
        };
        self.persist_playback(&self.playback_snapshot(), &lobby_id);
        if outcome == TrackEndedOutcome::Stopped {
            self.stop_sync_loop();
        }
        self.emit(LobbyEvent::TrackEnded {
            lobby_id,
            ended_track,
            repeat_mode,
        });
        if outcome == TrackEndedOutcome::Restarted {
            self.broadcast_sync();
        }
        outcome
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) {
        let lobby_id = {
            let mut state = self.state.lock().unwrap();
            state.playback.set_repeat_mode(mode);
            state.touch();
            state.id.clone()
        };
        self.persist_playback(&self.playback_snapshot(), &lobby_id);
    }

    pub fn toggle_shuffle(&self, enabled: bool) {
        let lobby_id = {
            let mut state = self.state.lock().unwrap();
            let len = state.queue.len();
            state.playback.toggle_shuffle(enabled, len);
            state.touch();
            state.id.clone()
        };
        self.persist_playback(&self.playback_snapshot(), &lobby_id);
        self.emit(LobbyEvent::ShuffleChanged {
            lobby_id,
            shuffle_enabled: enabled,
        });
    }

    pub fn next_shuffle_index(&self) -> Option<usize> {
        let mut state = self.state.lock().unwrap();
        let len = state.queue.len();
        state.playback.next_shuffle_index(len)
    }

    /// Reported-position handling: emits a unicast force-sync if the
    /// reported client position has drifted past the threshold from the
    /// server's authoritative effective position.
    pub fn report_position(&self, conn_id: &str, client_position: f64) {
        let state = self.state.lock().unwrap();
        let now = Utc::now();
        let server_pos = state.playback.effective_position(now);
        if (server_pos - client_position).abs() > DRIFT_THRESHOLD_SECS {
            let payload = Self::sync_payload(&state, now);
            drop(state);
            self.emit(LobbyEvent::ForceSync {
                to_conn_id: conn_id.to_string(),
                payload,
            });
        }
    }

    /// Orphaned-playback cleanup at the single-lobby level: dropping a
    /// lobby already drops its playback state with it, so the orphan sweep
    /// lives in the registry (it owns the set of valid ids), not here.
    fn ensure_sync_loop_running(self: &Arc<Self>) {
        let mut guard = self.sync_task.lock().unwrap();
        if guard.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let this = Arc::clone(self);
        *guard = Some(tokio::spawn(async move {
            this.sync_loop().await;
        }));
    }

    fn stop_sync_loop(&self) {
        if let Some(handle) = self.sync_task.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// At most one loop per lobby: ticks every 1000ms while playing,
    /// broadcasting sync and invoking track-ended once the effective
    /// position reaches the track's duration.
    async fn sync_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(Duration::from_millis(SYNC_INTERVAL_MS));
        loop {
            interval.tick().await;
            let (is_playing, ended) = {
                let state = self.state.lock().unwrap();
                if !state.playback.is_playing {
                    (false, false)
                } else {
                    let now = Utc::now();
                    let effective = state.playback.effective_position(now);
                    let duration = state.playback.current_track.as_ref().map(|t| t.duration);
                    let ended = duration.is_some_and(|d| effective >= d);
                    (true, ended)
                }
            };
            if !is_playing {
                break;
            }
            self.broadcast_sync();
            if ended {
                self.track_ended();
                break;
            }
        }
    }
}

fn to_chat_row(message: &ChatMessage) -> clstore::ChatMessageRow {
    clstore::ChatMessageRow {
        id: message.id.clone(),
        lobby_id: message.lobby_id.clone(),
        user_id: message.user_id.clone(),
        username: message.username.clone(),
        emoji: message.emoji.clone(),
        content: message.content.clone(),
        created_at: message.timestamp,
    }
}
