//! Component E: the per-lobby playback state machine.
//!
//! The state itself is plain data — no locking, no I/O — so it can be unit
//! tested directly; [`crate::lobby::LobbyHandle`] is what wraps it in a
//! mutex and wires its transitions to persistence and the sync loop.

use chrono::{DateTime, Utc};
use clstore::PlaybackStateRow;
pub use clstore::RepeatMode;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::song::Song;

/// How far a client's reported position may drift from the server's
/// effective position before a unicast force-sync is warranted (§4.E).
pub const DRIFT_THRESHOLD_SECS: f64 = 2.0;

/// Cadence of the periodic sync broadcast while a lobby is playing.
pub const SYNC_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackState {
    pub current_track: Option<Song>,
    pub position: f64,
    pub is_playing: bool,
    #[serde(skip)]
    pub started_at: Option<DateTime<Utc>>,
    pub repeat_mode: RepeatMode,
    pub shuffle_enabled: bool,
    pub shuffled_indices: Vec<usize>,
    pub shuffle_index: usize,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_track: None,
            position: 0.0,
            is_playing: false,
            started_at: None,
            repeat_mode: RepeatMode::Off,
            shuffle_enabled: false,
            shuffled_indices: Vec::new(),
            shuffle_index: 0,
        }
    }
}

/// The result of a `trackEnded` call: what the caller (the lobby, then the
/// Gateway) should do next with the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEndedOutcome {
    /// `repeatMode == one`: the same track was restarted; no queue action.
    Restarted,
    /// No repeat (or `all`, handled by the caller moving the head to the
    /// tail before calling `setTrack` again): playback stopped, queue
    /// advancement is the caller's responsibility.
    Stopped,
}

impl PlaybackState {
    /// `effective position = isPlaying ? position + (now - startedAt) : position`.
    pub fn effective_position(&self, now: DateTime<Utc>) -> f64 {
        match (self.is_playing, self.started_at) {
            (true, Some(started_at)) => {
                self.position + (now - started_at).num_milliseconds() as f64 / 1000.0
            }
            _ => self.position,
        }
    }

    /// `play(track)`: same-id resume, otherwise a fresh track from zero.
    pub fn play(&mut self, track: Song, now: DateTime<Utc>) {
        if self.current_track.as_ref().map(|t| &t.id) == Some(&track.id) {
            self.is_playing = true;
            self.started_at = Some(now);
        } else {
            self.current_track = Some(track);
            self.position = 0.0;
            self.is_playing = true;
            self.started_at = Some(now);
        }
    }

    pub fn pause(&mut self, now: DateTime<Utc>) {
        self.position = self.effective_position(now);
        self.is_playing = false;
        self.started_at = None;
    }

    /// Requires `current_track` to already be set; no-op return value kept
    /// simple (`bool`) since the caller (the Gateway) decides what to do on
    /// `false` — per §4.I's `playback:toggle`, usually "set first queue song
    /// instead".
    pub fn resume(&mut self, now: DateTime<Utc>) -> bool {
        if self.current_track.is_none() {
            return false;
        }
        self.is_playing = true;
        self.started_at = Some(now);
        true
    }

    pub fn seek(&mut self, pos: f64, now: DateTime<Utc>) {
        self.position = pos.max(0.0);
        if self.is_playing {
            self.started_at = Some(now);
        }
    }

    pub fn set_track(&mut self, track: Song, auto_play: bool, now: DateTime<Utc>) {
        self.current_track = Some(track);
        self.position = 0.0;
        self.is_playing = auto_play;
        self.started_at = if auto_play { Some(now) } else { None };
    }

    /// `trackEnded()`: restarts in place for `repeat=one`, otherwise clears
    /// the playing flag and zeroes position, leaving queue advancement to
    /// the caller.
    pub fn track_ended(&mut self, now: DateTime<Utc>) -> TrackEndedOutcome {
        if self.repeat_mode == RepeatMode::One {
            self.position = 0.0;
            self.is_playing = true;
            self.started_at = Some(now);
            TrackEndedOutcome::Restarted
        } else {
            self.is_playing = false;
            self.position = 0.0;
            self.started_at = None;
            TrackEndedOutcome::Stopped
        }
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat_mode = mode;
    }

    /// Builds (or clears) a Fisher-Yates permutation of `[0, queue_len)`.
    pub fn toggle_shuffle(&mut self, enabled: bool, queue_len: usize) {
        self.shuffle_enabled = enabled;
        if enabled {
            self.shuffled_indices = fisher_yates(queue_len);
            self.shuffle_index = 0;
        } else {
            self.shuffled_indices.clear();
            self.shuffle_index = 0;
        }
    }

    /// Advances the shuffle cursor, reshuffling on wrap. Returns the next
    /// queue index, or `None` if shuffle is off or the queue is empty.
    pub fn next_shuffle_index(&mut self, queue_len: usize) -> Option<usize> {
        if !self.shuffle_enabled || queue_len == 0 {
            return None;
        }
        if self.shuffled_indices.len() != queue_len {
            self.shuffled_indices = fisher_yates(queue_len);
            self.shuffle_index = 0;
        } else {
            self.shuffle_index += 1;
            if self.shuffle_index >= self.shuffled_indices.len() {
                self.shuffled_indices = fisher_yates(queue_len);
                self.shuffle_index = 0;
            }
        }
        self.shuffled_indices.get(self.shuffle_index).copied()
    }

    /// Regenerates the permutation when the queue length changed materially
    /// (a song was added/removed) while shuffle is enabled.
    pub fn update_shuffle_for_queue_change(&mut self, queue_len: usize) {
        if self.shuffle_enabled && self.shuffled_indices.len() != queue_len {
            self.shuffled_indices = fisher_yates(queue_len);
            self.shuffle_index = 0;
        }
    }

    pub fn to_row(&self, lobby_id: &str) -> PlaybackStateRow {
        PlaybackStateRow {
            lobby_id: lobby_id.to_string(),
            current_track: self
                .current_track
                .as_ref()
                .map(|t| serde_json::to_value(t).unwrap()),
            position: self.position,
            is_playing: self.is_playing,
            started_at: self.started_at,
            shuffle_enabled: self.shuffle_enabled,
            shuffled_indices: self.shuffled_indices.iter().map(|i| *i as i64).collect(),
            shuffle_index: self.shuffle_index as i64,
            repeat_mode: self.repeat_mode,
        }
    }

    /// Restores state from a persisted row, forcing `is_playing = false` per
    /// §4.E so a restart never leaves a phantom playhead advancing. The
    /// current track itself must be re-resolved by the caller against the
    /// live queue (the row stores a JSON snapshot, not a live `Song`).
    pub fn from_row(row: PlaybackStateRow, current_track: Option<Song>) -> Self {
        Self {
            current_track,
            position: row.position,
            is_playing: false,
            started_at: None,
            repeat_mode: row.repeat_mode,
            shuffle_enabled: row.shuffle_enabled,
            shuffled_indices: row.shuffled_indices.iter().map(|i| *i as usize).collect(),
            shuffle_index: row.shuffle_index as usize,
        }
    }
}

fn fisher_yates(len: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(&mut rand::rng());
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::NewSong;

    fn track(id: &str) -> Song {
        let mut song = Song::new(NewSong {
            url: format!("http://{id}"),
            title: id.to_string(),
            duration: 10.0,
            added_by: None,
            thumbnail: None,
        });
        song.id = id.to_string();
        song
    }

    #[test]
    fn play_resets_position_for_new_track() {
        let mut state = PlaybackState::default();
        let now = Utc::now();
        state.play(track("a"), now);
        assert_eq!(state.position, 0.0);
        assert!(state.is_playing);

        state.position = 5.0;
        state.is_playing = false;
        state.started_at = None;
        state.play(track("a"), now);
        assert_eq!(state.position, 5.0, "same-id play should resume, not reset");
    }

    #[test]
    fn pause_freezes_effective_position() {
        let mut state = PlaybackState::default();
        let t0 = Utc::now();
        state.play(track("a"), t0);
        let t1 = t0 + chrono::Duration::seconds(3);
        state.pause(t1);
        assert!((state.position - 3.0).abs() < 0.05);
        assert!(state.started_at.is_none());
        assert!(!state.is_playing);
    }

    #[test]
    fn track_ended_restarts_on_repeat_one() {
        let mut state = PlaybackState::default();
        let now = Utc::now();
        state.play(track("a"), now);
        state.set_repeat_mode(RepeatMode::One);
        let outcome = state.track_ended(now + chrono::Duration::seconds(10));
        assert_eq!(outcome, TrackEndedOutcome::Restarted);
        assert_eq!(state.position, 0.0);
        assert!(state.is_playing);
    }

    #[test]
    fn track_ended_stops_without_repeat() {
        let mut state = PlaybackState::default();
        let now = Utc::now();
        state.play(track("a"), now);
        let outcome = state.track_ended(now + chrono::Duration::seconds(10));
        assert_eq!(outcome, TrackEndedOutcome::Stopped);
        assert!(!state.is_playing);
    }

    #[test]
    fn shuffle_toggle_round_trips() {
        let mut state = PlaybackState::default();
        state.toggle_shuffle(true, 5);
        let mut sorted = state.shuffled_indices.clone();
        sorted.sort();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4]);

        state.toggle_shuffle(false, 5);
        assert!(state.shuffled_indices.is_empty());
    }

    #[test]
    fn shuffle_cursor_reshuffles_on_wrap() {
        let mut state = PlaybackState::default();
        state.toggle_shuffle(true, 3);
        for _ in 0..3 {
            assert!(state.next_shuffle_index(3).is_some());
        }
        // cursor has now wrapped at least once; still yields a valid index.
        assert!(state.next_shuffle_index(3).unwrap() < 3);
    }
}
