use chrono::{DateTime, Utc};
use serde::Serialize;

/// A connection's mode within its lobby: actively listening to the shared
/// stream, or just present in the lobby UI (e.g. browsing, chatting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserMode {
    Listening,
    Lobby,
}

/// A transient membership record (§3 "User"). Lives only while the
/// connection is open; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub conn_id: String,
    pub username: String,
    pub emoji: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub mode: UserMode,
}

pub const MAX_USERNAME_LEN: usize = 30;

impl User {
    pub fn new(conn_id: impl Into<String>, username: String, emoji: Option<String>) -> Self {
        Self {
            conn_id: conn_id.into(),
            username: truncate(username, MAX_USERNAME_LEN),
            emoji,
            joined_at: Utc::now(),
            mode: UserMode::Listening,
        }
    }
}

pub fn truncate(mut s: String, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        s = s.chars().take(max_chars).collect();
    }
    s
}
