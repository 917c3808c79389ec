//! An in-memory log ring fed by a custom `tracing::Layer`, exposed over SSE
//! and as a JSON dump for the admin dashboard — the same shape as
//! `pmoserver::logs` (`LogState`/`log_sse`/`log_dump`).
//!
//! `pmoserver`'s own feed mechanism (`logs::sselayer::SseLayer`) wasn't
//! available to copy from, so [`SseLayer`] here is a fresh `tracing_subscriber`
//! layer in the same spirit: it visits each event's fields for a `message`,
//! reads the event's level/target from its metadata, and pushes a [`LogEntry`]
//! into the shared [`LogState`] ring + broadcast.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::field::{Field, Visit};
use tracing::Subscriber;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

const BROADCAST_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
}

#[derive(Clone)]
pub struct LogState {
    buffer: Arc<RwLock<VecDeque<LogEntry>>>,
    capacity: usize,
    tx: broadcast::Sender<LogEntry>,
}

impl LogState {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            tx: broadcast::channel(BROADCAST_CAPACITY).0,
        }
    }

    fn push(&self, entry: LogEntry) {
        let mut buf = self.buffer.write().unwrap();
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(entry.clone());
        let _ = self.tx.send(entry);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }

    pub fn dump(&self) -> Vec<LogEntry> {
        self.buffer.read().unwrap().iter().cloned().collect()
    }
}

/// Options for [`super::Server::init_logging`].
pub struct LoggingOptions {
    pub buffer_capacity: usize,
    pub enable_console: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: 1000,
            enable_console: true,
        }
    }
}

/// Feeds a [`LogState`] from live `tracing` events.
pub struct SseLayer {
    state: LogState,
}

impl SseLayer {
    pub fn new(state: LogState) -> Self {
        Self { state }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for SseLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.state.push(LogEntry {
            timestamp: Utc::now(),
            level: event.metadata().level().to_string().to_lowercase(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
        });
    }
}

/// Sets up `tracing_subscriber` (env-filter + optional fmt layer + the SSE
/// feed) once, returning the [`LogState`] the dashboard routes read from.
/// Mirrors `pmoserver::logs::init_logging`'s role, simplified to a plain
/// function since this crate has no server-wide mutable state to attach it to.
pub fn init_logging(options: LoggingOptions) -> LogState {
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::layer::SubscriberExt;

    let state = LogState::new(options.buffer_capacity);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(SseLayer::new(state.clone()));

    if options.enable_console {
        registry.with(tracing_subscriber::fmt::layer()).init();
    } else {
        registry.init();
    }

    state
}

#[derive(Debug, Deserialize, Default)]
pub struct LogQuery {
    #[serde(default)]
    pub error: Option<bool>,
    #[serde(default)]
    pub warn: Option<bool>,
    #[serde(default)]
    pub info: Option<bool>,
    #[serde(default)]
    pub debug: Option<bool>,
    #[serde(default)]
    pub trace: Option<bool>,
    #[serde(default)]
    pub search: Option<String>,
}

pub async fn log_sse(
    State(state): State<LogState>,
    Query(params): Query<LogQuery>,
) -> impl IntoResponse {
    let mut rx = state.subscribe();
    let history = state.dump();

    let stream = async_stream::stream! {
        for entry in history {
            if !filter_entry(&entry, &params) {
                continue;
            }
            let json = serde_json::to_string(&entry).unwrap();
            yield Ok::<_, axum::Error>(Event::default().data(json));
        }
        while let Ok(entry) = rx.recv().await {
            if !filter_entry(&entry, &params) {
                continue;
            }
            let json = serde_json::to_string(&entry).unwrap();
            yield Ok::<_, axum::Error>(Event::default().data(json));
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn log_dump(State(state): State<LogState>) -> impl IntoResponse {
    Json(state.dump())
}

fn filter_entry(entry: &LogEntry, q: &LogQuery) -> bool {
    let any_level_flag =
        q.error.unwrap_or(false) || q.warn.unwrap_or(false) || q.info.unwrap_or(false) || q.debug.unwrap_or(false) || q.trace.unwrap_or(false);

    let level_allowed = if any_level_flag {
        match entry.level.as_str() {
            "error" => q.error.unwrap_or(false),
            "warn" => q.warn.unwrap_or(false),
            "info" => q.info.unwrap_or(false),
            "debug" => q.debug.unwrap_or(false),
            "trace" => q.trace.unwrap_or(false),
            _ => false,
        }
    } else {
        true
    };

    level_allowed
        && q.search
            .as_ref()
            .map(|s| entry.message.contains(s) || entry.target.contains(s))
            .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_drops_oldest_over_capacity() {
        let state = LogState::new(2);
        for i in 0..5 {
            state.push(LogEntry {
                timestamp: Utc::now(),
                level: "info".into(),
                target: "test".into(),
                message: format!("msg {i}"),
            });
        }
        let dump = state.dump();
        assert_eq!(dump.len(), 2);
        assert_eq!(dump[0].message, "msg 3");
        assert_eq!(dump[1].message, "msg 4");
    }

    #[test]
    fn filter_with_no_level_flags_allows_everything() {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: "warn".into(),
            target: "t".into(),
            message: "hello".into(),
        };
        assert!(filter_entry(&entry, &LogQuery::default()));
    }

    #[test]
    fn filter_by_level_excludes_others() {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: "debug".into(),
            target: "t".into(),
            message: "hello".into(),
        };
        let q = LogQuery {
            error: Some(true),
            ..Default::default()
        };
        assert!(!filter_entry(&entry, &q));
    }
}
