//! Component G: a bounded in-memory chat history per lobby plus a
//! per-connection rate limiter.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const HISTORY_CAPACITY: usize = 100;
pub const MAX_CONTENT_LEN: usize = 500;
pub const THROTTLE_WINDOW_SECS: i64 = 10;
pub const THROTTLE_MAX_MESSAGES: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub lobby_id: String,
    pub user_id: String,
    pub username: String,
    pub emoji: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A sliding-window rate limiter: 5 messages per 10s window, the 6th within
/// that window is throttled.
#[derive(Debug, Default)]
pub struct RateLimiter {
    sent_at: HashMap<String, VecDeque<DateTime<Utc>>>,
}

impl RateLimiter {
    pub fn is_throttled(&mut self, conn_id: &str, now: DateTime<Utc>) -> bool {
        let cutoff = now - chrono::Duration::seconds(THROTTLE_WINDOW_SECS);
        let entry = self.sent_at.entry(conn_id.to_string()).or_default();
        while entry.front().is_some_and(|t| *t < cutoff) {
            entry.pop_front();
        }
        if entry.len() >= THROTTLE_MAX_MESSAGES {
            return true;
        }
        entry.push_back(now);
        false
    }

    pub fn remove(&mut self, conn_id: &str) {
        self.sent_at.remove(conn_id);
    }
}

/// A fixed-capacity ring of the most recent messages for one lobby.
#[derive(Debug, Default)]
pub struct ChatHistory {
    messages: VecDeque<ChatMessage>,
}

impl ChatHistory {
    pub fn push(
        &mut self,
        lobby_id: &str,
        user_id: &str,
        username: &str,
        emoji: Option<String>,
        content: &str,
    ) -> ChatMessage {
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            lobby_id: lobby_id.to_string(),
            user_id: user_id.to_string(),
            username: username.to_string(),
            emoji,
            content: truncate(content, MAX_CONTENT_LEN),
            timestamp: Utc::now(),
        };
        if self.messages.len() >= HISTORY_CAPACITY {
            self.messages.pop_front();
        }
        self.messages.push_back(message.clone());
        message
    }

    /// Restores history from a durable log at cold start / cache-miss,
    /// replacing whatever's in memory.
    pub fn reload(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages.into_iter().collect();
        while self.messages.len() > HISTORY_CAPACITY {
            self.messages.pop_front();
        }
    }

    pub fn recent(&self, limit: usize) -> Vec<ChatMessage> {
        let skip = self.messages.len().saturating_sub(limit);
        self.messages.iter().skip(skip).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        s.chars().take(max_chars).collect()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_bounded() {
        let mut history = ChatHistory::default();
        for i in 0..(HISTORY_CAPACITY + 10) {
            history.push("L1", "u1", "Alice", None, &format!("msg {i}"));
        }
        assert_eq!(history.recent(HISTORY_CAPACITY + 10).len(), HISTORY_CAPACITY);
    }

    #[test]
    fn content_is_truncated() {
        let mut history = ChatHistory::default();
        let long = "a".repeat(600);
        let message = history.push("L1", "u1", "Alice", None, &long);
        assert_eq!(message.content.chars().count(), MAX_CONTENT_LEN);
    }

    #[test]
    fn sixth_message_in_window_is_throttled() {
        let mut limiter = RateLimiter::default();
        let now = Utc::now();
        for _ in 0..THROTTLE_MAX_MESSAGES {
            assert!(!limiter.is_throttled("connA", now));
        }
        assert!(limiter.is_throttled("connA", now));
    }

    #[test]
    fn throttle_resets_after_window() {
        let mut limiter = RateLimiter::default();
        let now = Utc::now();
        for _ in 0..THROTTLE_MAX_MESSAGES {
            limiter.is_throttled("connA", now);
        }
        let later = now + chrono::Duration::seconds(THROTTLE_WINDOW_SECS + 1);
        assert!(!limiter.is_throttled("connA", later));
    }
}
