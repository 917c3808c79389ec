//! Component H: persistent per-user song collections, independent of any
//! lobby.
//!
//! Grounded in `pmoplaylist::manager`/`api.rs`'s CRUD-plus-reorder shape, but
//! trimmed down: no lazy/TTL cache entries, no
//! broadcast eventing — a playlist is a plain owned list a user edits through
//! REST, not a thing other components subscribe to. Every operation degrades
//! to `Error::Unavailable` when the store has no `DATABASE_URL`, which the
//! HTTP surface maps to a 503 per §7's `CapabilityUnavailable`.

pub use clstore::{Error, PlaylistRow, PlaylistSongRow, Result};

use chrono::Utc;
use clstore::Store;
use uuid::Uuid;

/// A playlist together with its ordered songs, the shape returned to API
/// callers that need the full detail view.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PlaylistDetail {
    #[serde(flatten)]
    pub playlist: PlaylistRow,
    pub songs: Vec<PlaylistSongRow>,
}

/// Fields accepted when adding a song to a playlist.
#[derive(Debug, Clone)]
pub struct NewPlaylistSong {
    pub url: String,
    pub title: String,
    pub duration: f64,
    pub thumbnail: Option<String>,
}

#[derive(Clone)]
pub struct PlaylistStore {
    store: Store,
}

impl PlaylistStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn is_available(&self) -> bool {
        self.store.is_available()
    }

    pub fn create_playlist(&self, user_id: &str, name: &str) -> Result<PlaylistRow> {
        let row = PlaylistRow {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.store.insert_playlist(&row)?;
        Ok(row)
    }

    pub fn list_playlists(&self, user_id: &str) -> Result<Vec<PlaylistRow>> {
        self.store.list_playlists(user_id)
    }

    pub fn get_playlist(&self, id: &str) -> Result<PlaylistDetail> {
        let playlist = self.store.get_playlist(id)?.ok_or(Error::NotFound)?;
        let songs = self.store.list_playlist_songs(id)?;
        Ok(PlaylistDetail { playlist, songs })
    }

    pub fn rename_playlist(&self, id: &str, name: &str) -> Result<()> {
        self.store.get_playlist(id)?.ok_or(Error::NotFound)?;
        self.store.rename_playlist(id, name)
    }

    pub fn delete_playlist(&self, id: &str) -> Result<()> {
        self.store.get_playlist(id)?.ok_or(Error::NotFound)?;
        self.store.delete_playlist(id)
    }

    /// Appends a song with the next dense `sort_order`, the same
    /// append-at-tail convention the queue engine uses.
    pub fn add_song(&self, playlist_id: &str, fields: NewPlaylistSong) -> Result<PlaylistSongRow> {
        self.store.get_playlist(playlist_id)?.ok_or(Error::NotFound)?;
        let next_order = self.store.list_playlist_songs(playlist_id)?.len() as i64;
        let row = PlaylistSongRow {
            id: Uuid::new_v4().to_string(),
            playlist_id: playlist_id.to_string(),
            url: fields.url,
            title: fields.title,
            duration: fields.duration,
            thumbnail: fields.thumbnail,
            sort_order: next_order,
            added_at: Utc::now(),
        };
        self.store.add_playlist_song(&row)?;
        Ok(row)
    }

    pub fn remove_song(&self, playlist_id: &str, song_id: &str) -> Result<()> {
        self.store.remove_playlist_song(playlist_id, song_id)?;
        self.densify(playlist_id)
    }

    /// Moves a song to `new_index`, keeping `sort_order` dense in one
    /// transaction, mirroring the queue engine's `reorderSong` tie-break
    /// rule: same index is a no-op, out-of-range is rejected.
    pub fn reorder_song(&self, playlist_id: &str, song_id: &str, new_index: usize) -> Result<bool> {
        let mut songs = self.store.list_playlist_songs(playlist_id)?;
        let Some(current_index) = songs.iter().position(|s| s.id == song_id) else {
            return Ok(false);
        };
        if new_index >= songs.len() {
            return Ok(false);
        }
        if new_index == current_index {
            return Ok(true);
        }

        let song = songs.remove(current_index);
        songs.insert(new_index, song);
        let ordered_ids: Vec<String> = songs.iter().map(|s| s.id.clone()).collect();
        self.store.reorder_playlist_songs(playlist_id, &ordered_ids)?;
        Ok(true)
    }

    fn densify(&self, playlist_id: &str) -> Result<()> {
        let songs = self.store.list_playlist_songs(playlist_id)?;
        let ordered_ids: Vec<String> = songs.iter().map(|s| s.id.clone()).collect();
        self.store.reorder_playlist_songs(playlist_id, &ordered_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> PlaylistStore {
        PlaylistStore::new(Store::open_in_memory().unwrap())
    }

    fn song(url: &str) -> NewPlaylistSong {
        NewPlaylistSong {
            url: url.to_string(),
            title: url.to_string(),
            duration: 10.0,
            thumbnail: None,
        }
    }

    #[test]
    fn unavailable_store_degrades_to_error() {
        let store = PlaylistStore::new(Store::open(None).unwrap());
        assert!(!store.is_available());
        assert!(matches!(store.create_playlist("u1", "mix"), Err(Error::Unavailable)));
    }

    #[test]
    fn crud_round_trips() {
        let store = store();
        let playlist = store.create_playlist("u1", "mix").unwrap();
        let detail = store.get_playlist(&playlist.id).unwrap();
        assert_eq!(detail.playlist.name, "mix");
        assert!(detail.songs.is_empty());

        store.rename_playlist(&playlist.id, "renamed").unwrap();
        assert_eq!(store.get_playlist(&playlist.id).unwrap().playlist.name, "renamed");

        store.delete_playlist(&playlist.id).unwrap();
        assert!(matches!(store.get_playlist(&playlist.id), Err(Error::NotFound)));
    }

    #[test]
    fn reorder_keeps_sort_orders_dense() {
        let store = store();
        let playlist = store.create_playlist("u1", "mix").unwrap();
        let a = store.add_song(&playlist.id, song("a")).unwrap();
        let _b = store.add_song(&playlist.id, song("b")).unwrap();
        let _c = store.add_song(&playlist.id, song("c")).unwrap();

        assert!(store.reorder_song(&playlist.id, &a.id, 2).unwrap());
        let songs = store.get_playlist(&playlist.id).unwrap().songs;
        assert_eq!(songs.iter().map(|s| s.url.as_str()).collect::<Vec<_>>(), vec!["b", "c", "a"]);
        assert_eq!(songs.iter().map(|s| s.sort_order).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn reorder_out_of_range_returns_false() {
        let store = store();
        let playlist = store.create_playlist("u1", "mix").unwrap();
        let a = store.add_song(&playlist.id, song("a")).unwrap();
        assert!(!store.reorder_song(&playlist.id, &a.id, 5).unwrap());
        assert!(!store.reorder_song(&playlist.id, "missing", 0).unwrap());
    }
}
