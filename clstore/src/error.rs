use thiserror::Error;

/// Errors surfaced by the persistence store.
///
/// Persistence failures from mutating background
/// paths are logged and swallowed by callers;
/// this enum exists for the handful of call sites — notably the Playlist
/// Store — that must surface a typed failure to an HTTP caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("the persistence store is not configured (DATABASE_URL unset)")]
    Unavailable,
    #[error("not found")]
    NotFound,
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
