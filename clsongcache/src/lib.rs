//! Component B: the background fetch+transcode pipeline that turns a source
//! url into a locally cached audio file, with a status FSM, deduplication,
//! and a TTL sweep.

mod events;
pub mod ytdlp;

pub use events::DownloadEvent;
pub use clstore::{CachedSongRow, SongStatus};

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use clmetadata::{ExternalFetcher, TrackMetadata};
use clstore::Store;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
    #[error("persistence store unavailable")]
    StoreUnavailable,
    #[error(transparent)]
    Store(#[from] clstore::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_MAX_AGE_SECS: i64 = 7 * 24 * 3600;
const TTL_SWEEP_INTERVAL: Duration = Duration::from_secs(6 * 3600);

pub struct SongCache {
    store: Store,
    dir: PathBuf,
    fetcher: Arc<dyn ExternalFetcher>,
    inflight: Mutex<HashSet<String>>,
    events: broadcast::Sender<DownloadEvent>,
}

impl SongCache {
    pub fn new(store: Store, dir: impl Into<PathBuf>, fetcher: Arc<dyn ExternalFetcher>) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            store,
            dir: dir.into(),
            fetcher,
            inflight: Mutex::new(HashSet::new()),
            events: tx,
        })
    }

    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DownloadEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: DownloadEvent) {
        let _ = self.events.send(event);
    }

    fn file_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.mp3"))
    }

    /// Ensures a download exists for `url`, returning its song id, or `None`
    /// iff the persistence store is unavailable.
    pub async fn start_download(
        self: &Arc<Self>,
        url: &str,
        hint: Option<TrackMetadata>,
        lobby_id: Option<String>,
    ) -> Option<String> {
        if !self.store.is_available() {
            return None;
        }

        let now = Utc::now();
        let candidate_row = CachedSongRow {
            id: Uuid::new_v4().to_string(),
            url: url.to_string(),
            title: hint.as_ref().map(|h| h.title.clone()),
            duration: hint.as_ref().map(|h| h.duration),
            file_path: None,
            thumbnail_url: hint.as_ref().and_then(|h| h.thumbnail_url.clone()),
            status: SongStatus::Pending,
            error_message: None,
            created_at: now,
            updated_at: now,
        };

        // Atomic lookup-or-insert: closes the race window two concurrent
        // startDownload(url) calls would otherwise hit between a separate
        // SELECT and INSERT.
        let (row, created) = match self.store.get_or_insert_pending_song(url, &candidate_row) {
            Ok(pair) => pair,
            Err(e) => {
                warn!("failed to resolve cached song row: {e}");
                return None;
            }
        };

        let id = if created {
            row.id
        } else {
            let file_missing = row.status == SongStatus::Ready
                && !matches!(&row.file_path, Some(p) if tokio::fs::metadata(p).await.is_ok());

            match row.status {
                SongStatus::Downloading => return Some(row.id),
                SongStatus::Ready if !file_missing => return Some(row.id),
                SongStatus::Ready | SongStatus::Error => {
                    if let Err(e) = self.store.reset_song_to_pending(&row.id) {
                        warn!("failed to reset song {}: {e}", row.id);
                    }
                    row.id
                }
                SongStatus::Pending => row.id,
            }
        };

        {
            let mut inflight = self.inflight.lock().unwrap();
            if !inflight.insert(url.to_string()) {
                // another task already owns this url's pipeline.
                return Some(id);
            }
        }

        let this = Arc::clone(self);
        let url = url.to_string();
        let id_for_task = id.clone();
        tokio::spawn(async move {
            this.run_pipeline(&id_for_task, &url, lobby_id).await;
            this.inflight.lock().unwrap().remove(&url);
        });

        Some(id)
    }

    async fn run_pipeline(&self, id: &str, url: &str, lobby_id: Option<String>) {
        if let Err(e) = self.store.set_song_downloading(id) {
            warn!("failed to mark song {id} downloading: {e}");
        }
        self.emit(DownloadEvent {
            url: url.to_string(),
            song_id: id.to_string(),
            status: SongStatus::Downloading,
            percent: Some(0.0),
            error: None,
            lobby_id: lobby_id.clone(),
        });

        match self.download_and_write(id, url, &lobby_id).await {
            Ok(file_path) => {
                if let Err(e) = self.store.set_song_ready(id, &file_path, None) {
                    warn!("failed to mark song {id} ready: {e}");
                }
                self.emit(DownloadEvent {
                    url: url.to_string(),
                    song_id: id.to_string(),
                    status: SongStatus::Ready,
                    percent: Some(100.0),
                    error: None,
                    lobby_id,
                });
                info!(song_id = %id, "song cached");
            }
            Err(message) => {
                let path = self.file_path(id);
                let _ = tokio::fs::remove_file(&path).await;
                if let Err(e) = self.store.set_song_error(id, &message) {
                    warn!("failed to mark song {id} errored: {e}");
                }
                self.emit(DownloadEvent {
                    url: url.to_string(),
                    song_id: id.to_string(),
                    status: SongStatus::Error,
                    percent: None,
                    error: Some(message.clone()),
                    lobby_id,
                });
                error!(song_id = %id, error = %message, "song download failed");
            }
        }
    }

    async fn download_and_write(
        &self,
        id: &str,
        url: &str,
        _lobby_id: &Option<String>,
    ) -> std::result::Result<String, String> {
        let mut stream = self
            .fetcher
            .create_transcoded_stream(url)
            .await
            .map_err(|e| e.to_string())?;

        let path = self.file_path(id);
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| e.to_string())?;

        let written = tokio::io::copy(&mut stream, &mut file)
            .await
            .map_err(|e| e.to_string())?;
        file.flush().await.map_err(|e| e.to_string())?;

        if written == 0 {
            return Err("transcoded stream produced an empty file".to_string());
        }

        Ok(path.to_string_lossy().into_owned())
    }

    /// Claims responsibility for caching `url` from the live-transcode HTTP
    /// path (`clhttp::stream::live_transcode`) instead of the background
    /// pipeline: marks the row `downloading`, claims `url` in `inflight` so
    /// a concurrent background `startDownload` (or another live request)
    /// doesn't also try to write the file, and hands back the id plus the
    /// path its `TeeReader` should write to. Returns `None` when the store
    /// is unavailable, or the row is already spoken for — `downloading`
    /// elsewhere, `ready` with its file present, or already claimed by
    /// another live request.
    pub async fn reserve_live_cache(self: &Arc<Self>, url: &str, hint: Option<TrackMetadata>) -> Option<(String, PathBuf)> {
        if !self.store.is_available() {
            return None;
        }

        let now = Utc::now();
        let candidate_row = CachedSongRow {
            id: Uuid::new_v4().to_string(),
            url: url.to_string(),
            title: hint.as_ref().map(|h| h.title.clone()),
            duration: hint.as_ref().map(|h| h.duration),
            file_path: None,
            thumbnail_url: hint.as_ref().and_then(|h| h.thumbnail_url.clone()),
            status: SongStatus::Pending,
            error_message: None,
            created_at: now,
            updated_at: now,
        };

        let (row, created) = match self.store.get_or_insert_pending_song(url, &candidate_row) {
            Ok(pair) => pair,
            Err(e) => {
                warn!("failed to resolve cached song row: {e}");
                return None;
            }
        };

        let id = if created {
            row.id
        } else {
            let file_missing = row.status == SongStatus::Ready
                && !matches!(&row.file_path, Some(p) if tokio::fs::metadata(p).await.is_ok());

            match row.status {
                SongStatus::Downloading => return None,
                SongStatus::Ready if !file_missing => return None,
                SongStatus::Ready | SongStatus::Error => {
                    if let Err(e) = self.store.reset_song_to_pending(&row.id) {
                        warn!("failed to reset song {}: {e}", row.id);
                    }
                    row.id
                }
                SongStatus::Pending => row.id,
            }
        };

        {
            let mut inflight = self.inflight.lock().unwrap();
            if !inflight.insert(url.to_string()) {
                return None;
            }
        }

        if let Err(e) = self.store.set_song_downloading(&id) {
            warn!("failed to mark song {id} downloading: {e}");
        }
        self.emit(DownloadEvent {
            url: url.to_string(),
            song_id: id.clone(),
            status: SongStatus::Downloading,
            percent: Some(0.0),
            error: None,
            lobby_id: None,
        });

        let path = self.file_path(&id);
        Some((id, path))
    }

    /// Finalizes a row claimed by [`Self::reserve_live_cache`] once the
    /// tee'd live stream has been fully consumed (or failed), releasing the
    /// `inflight` claim so a later request can retry.
    pub async fn finish_live_cache(&self, url: &str, id: &str, result: std::result::Result<(), String>) {
        match result {
            Ok(()) => {
                let path = self.file_path(id).to_string_lossy().into_owned();
                if let Err(e) = self.store.set_song_ready(id, &path, None) {
                    warn!("failed to mark song {id} ready: {e}");
                }
                self.emit(DownloadEvent {
                    url: url.to_string(),
                    song_id: id.to_string(),
                    status: SongStatus::Ready,
                    percent: Some(100.0),
                    error: None,
                    lobby_id: None,
                });
                info!(song_id = %id, "song cached via live tee");
            }
            Err(message) => {
                let path = self.file_path(id);
                let _ = tokio::fs::remove_file(&path).await;
                if let Err(e) = self.store.set_song_error(id, &message) {
                    warn!("failed to mark song {id} errored: {e}");
                }
                self.emit(DownloadEvent {
                    url: url.to_string(),
                    song_id: id.to_string(),
                    status: SongStatus::Error,
                    percent: None,
                    error: Some(message.clone()),
                    lobby_id: None,
                });
                error!(song_id = %id, error = %message, "live-tee song cache failed");
            }
        }
        self.inflight.lock().unwrap().remove(url);
    }

    pub fn get_cached_song(&self, url: &str) -> Result<Option<CachedSongRow>> {
        Ok(self.store.get_cached_song_by_url(url)?)
    }

    /// Opens the cached file for streaming and returns its size in bytes,
    /// for the HTTP Surface's range-aware `/api/stream` handler.
    pub async fn open_cached_stream(&self, path: &str) -> Result<(tokio::fs::File, u64)> {
        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        Ok((file, size))
    }

    pub fn get_all_songs(&self) -> Result<Vec<CachedSongRow>> {
        Ok(self.store.get_all_songs()?)
    }

    pub async fn delete_song(&self, id: &str) -> Result<()> {
        if let Ok(Some(row)) = self.store.get_cached_song(id) {
            if let Some(path) = row.file_path {
                let _ = tokio::fs::remove_file(path).await;
            }
        }
        self.store.delete_song(id)?;
        Ok(())
    }

    pub async fn delete_all_songs(&self) -> Result<()> {
        for row in self.store.get_all_songs()? {
            if let Some(path) = row.file_path {
                let _ = tokio::fs::remove_file(path).await;
            }
        }
        self.store.delete_all_songs()?;
        Ok(())
    }

    /// Deletes rows older than `max_age_secs` (default 7 days) and unlinks
    /// their files.
    pub async fn cleanup_old_songs(&self, max_age_secs: i64) -> Result<usize> {
        let stale = self.store.songs_older_than(max_age_secs)?;
        for row in &stale {
            if let Some(path) = &row.file_path {
                let _ = tokio::fs::remove_file(path).await;
            }
            self.store.delete_song(&row.id)?;
        }
        Ok(stale.len())
    }

    /// Spawns the 6-hourly TTL sweep, cancelable by dropping the returned
    /// handle (the only shutdown contract this background timer needs).
    pub fn spawn_ttl_sweep(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TTL_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                match this.cleanup_old_songs(DEFAULT_MAX_AGE_SECS).await {
                    Ok(n) if n > 0 => info!(count = n, "song cache TTL sweep evicted rows"),
                    Ok(_) => debug!("song cache TTL sweep: nothing to evict"),
                    Err(e) => warn!("song cache TTL sweep failed: {e}"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clmetadata::{ExternalFetcher, FetchError, PlaylistItem};
    use tokio::io::AsyncRead;

    struct StubFetcher {
        body: Vec<u8>,
    }

    #[async_trait]
    impl ExternalFetcher for StubFetcher {
        async fn get_metadata(&self, url: &str) -> std::result::Result<TrackMetadata, FetchError> {
            Ok(TrackMetadata {
                title: "Stub Title".to_string(),
                duration: 5.0,
                source_url: url.to_string(),
                thumbnail_url: None,
            })
        }

        async fn create_transcoded_stream(
            &self,
            _url: &str,
        ) -> std::result::Result<Box<dyn AsyncRead + Send + Unpin>, FetchError> {
            Ok(Box::new(std::io::Cursor::new(self.body.clone())))
        }

        async fn get_playlist_items(
            &self,
            _url: &str,
        ) -> std::result::Result<Vec<PlaylistItem>, FetchError> {
            Ok(vec![])
        }

        async fn check_available(&self) -> bool {
            true
        }
    }

    fn fetcher(body: &[u8]) -> Arc<dyn ExternalFetcher> {
        Arc::new(StubFetcher { body: body.to_vec() })
    }

    #[tokio::test]
    async fn start_download_returns_none_without_store() {
        let store = Store::open(None).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cache = SongCache::new(store, dir.path(), fetcher(b"data"));
        assert!(cache.start_download("http://u", None, None).await.is_none());
    }

    #[tokio::test]
    async fn download_transitions_to_ready() {
        let store = Store::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cache = SongCache::new(store, dir.path(), fetcher(b"mp3-bytes"));
        cache.init().await.unwrap();

        let mut rx = cache.subscribe();
        let id = cache.start_download("http://u", None, None).await.unwrap();

        // drain events until ready or timeout
        for _ in 0..50 {
            if let Ok(event) = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await {
                if let Ok(event) = event {
                    if event.status == SongStatus::Ready {
                        break;
                    }
                }
            }
        }

        let row = cache.get_cached_song("http://u").unwrap().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.status, SongStatus::Ready);
        assert!(row.file_path.is_some());
    }

    #[tokio::test]
    async fn empty_stream_marks_song_errored() {
        let store = Store::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cache = SongCache::new(store, dir.path(), fetcher(b""));
        cache.init().await.unwrap();

        let mut rx = cache.subscribe();
        let _id = cache.start_download("http://empty", None, None).await.unwrap();

        let mut saw_error = false;
        for _ in 0..50 {
            if let Ok(Ok(event)) = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await {
                if event.status == SongStatus::Error {
                    saw_error = true;
                    break;
                }
            }
        }
        assert!(saw_error);
        let row = cache.get_cached_song("http://empty").unwrap().unwrap();
        assert_eq!(row.status, SongStatus::Error);
    }

    #[tokio::test]
    async fn concurrent_start_download_dedupes_to_one_id() {
        let store = Store::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cache = SongCache::new(store, dir.path(), fetcher(b"data"));
        cache.init().await.unwrap();

        let (a, b) = tokio::join!(
            cache.start_download("http://dup", None, None),
            cache.start_download("http://dup", None, None)
        );
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn reserve_live_cache_marks_downloading_and_finish_marks_ready() {
        let store = Store::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cache = SongCache::new(store, dir.path(), fetcher(b"data"));
        cache.init().await.unwrap();

        let (id, path) = cache.reserve_live_cache("http://live", None).await.unwrap();
        assert_eq!(cache.get_cached_song("http://live").unwrap().unwrap().status, SongStatus::Downloading);

        tokio::fs::write(&path, b"tee'd bytes").await.unwrap();
        cache.finish_live_cache("http://live", &id, Ok(())).await;

        let row = cache.get_cached_song("http://live").unwrap().unwrap();
        assert_eq!(row.status, SongStatus::Ready);
        assert_eq!(row.file_path.as_deref(), Some(path.to_str().unwrap()));
    }

    #[tokio::test]
    async fn reserve_live_cache_refuses_a_url_already_downloading() {
        let store = Store::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cache = SongCache::new(store, dir.path(), fetcher(b"data"));
        cache.init().await.unwrap();

        let _ = cache.reserve_live_cache("http://live2", None).await.unwrap();
        assert!(cache.reserve_live_cache("http://live2", None).await.is_none());
    }

    #[tokio::test]
    async fn finish_live_cache_error_marks_errored_and_removes_partial_file() {
        let store = Store::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cache = SongCache::new(store, dir.path(), fetcher(b"data"));
        cache.init().await.unwrap();

        let (id, path) = cache.reserve_live_cache("http://live3", None).await.unwrap();
        tokio::fs::write(&path, b"partial").await.unwrap();
        cache
            .finish_live_cache("http://live3", &id, Err("boom".to_string()))
            .await;

        let row = cache.get_cached_song("http://live3").unwrap().unwrap();
        assert_eq!(row.status, SongStatus::Error);
        assert_eq!(row.error_message.as_deref(), Some("boom"));
        assert!(tokio::fs::metadata(&path).await.is_err());
    }
}
