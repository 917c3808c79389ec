//! Shared state threaded through every HTTP Surface handler.

use std::sync::Arc;
use std::time::Instant;

use clgateway::Gateway;
use clplaylist::PlaylistStore;
use clstore::Store;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub playlists: PlaylistStore,
    pub store: Store,
    pub started_at: Instant,
    pub name: &'static str,
    pub version: &'static str,
}

impl AppState {
    pub fn new(
        gateway: Arc<Gateway>,
        playlists: PlaylistStore,
        store: Store,
        name: &'static str,
        version: &'static str,
    ) -> Self {
        Self {
            gateway,
            playlists,
            store,
            started_at: Instant::now(),
            name,
            version,
        }
    }
}
