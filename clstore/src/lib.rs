//! Relational persistence for lobbies, queues, playback state, chat,
//! the cached-song registry, and playlists — component A.
//!
//! Grounded in `pmoplaylist::persistence::PersistenceManager`: a single
//! `rusqlite::Connection` behind a `Mutex`, opened once at startup, with an
//! idempotent `init()` schema migration. A single store
//! here owns every entity's table rather than one store per crate, since
//! persistence is one component (§4.A) shared by
//! several others (D/E/F/G/H read and write through the same handle).
//!
//! When `DATABASE_URL` is unset the store is constructed in its unavailable
//! form: every read returns `Error::Unavailable` (or the caller's `None`/`[]`
//! degradation per §4.A/§7 `CapabilityUnavailable`) and no write is attempted.

mod chat;
mod error;
mod lobbies;
mod models;
mod playback;
mod playlists;
mod queue;
mod schema;
mod songs;

pub use error::{Error, Result};
pub use models::*;

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::info;

/// Handle to the persistence store. Cheap to clone; all clones share the same
/// underlying connection.
#[derive(Clone)]
pub struct Store {
    conn: Option<Arc<Mutex<Connection>>>,
}

impl Store {
    /// Opens (creating if necessary) the sqlite database at `path`, running
    /// schema migrations. `path == None` yields a store in its unavailable
    /// form, matching `isAvailable() == false` semantics.
    pub fn open(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            info!("DATABASE_URL not set; persistence store running memory-only");
            return Ok(Self { conn: None });
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        schema::init(&conn)?;
        info!(path = %path.display(), "persistence store opened");
        Ok(Self {
            conn: Some(Arc::new(Mutex::new(conn))),
        })
    }

    /// In-memory store used by tests; always available.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Some(Arc::new(Mutex::new(conn))),
        })
    }

    pub fn is_available(&self) -> bool {
        self.conn.is_some()
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self.conn.as_ref().ok_or(Error::Unavailable)?;
        let guard = conn.lock().expect("persistence connection mutex poisoned");
        Ok(f(&guard)?)
    }

    fn with_tx<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let conn = self.conn.as_ref().ok_or(Error::Unavailable)?;
        let mut guard = conn.lock().expect("persistence connection mutex poisoned");
        let tx = guard.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_store_rejects_reads() {
        let store = Store::open(None).unwrap();
        assert!(!store.is_available());
        assert!(store.get_lobby("missing").is_err());
    }

    #[test]
    fn in_memory_store_is_available() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.is_available());
    }
}
