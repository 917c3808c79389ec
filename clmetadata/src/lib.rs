//! Shared metadata types and the external fetcher boundary.
//!
//! The fetcher/transcoder pair (`yt-dlp` + `ffmpeg`) is deliberately out of
//! scope for this crate's own logic — only the interface shape and the
//! stderr classification rules live here, so
//! [`clsongcache`](../clsongcache) and tests can depend on a stub.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A resolved piece of track metadata, as returned by the external fetcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackMetadata {
    pub title: String,
    pub duration: f64,
    pub source_url: String,
    pub thumbnail_url: Option<String>,
}

/// One entry of a resolved playlist URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaylistItem {
    pub url: String,
    pub title: String,
    pub duration: f64,
    pub thumbnail_url: Option<String>,
}

/// Upstream failure codes, classified from the external tool's stderr per the
/// error taxonomy's `UpstreamFailure` kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpstreamErrorCode {
    VideoPrivate,
    VideoRestricted,
    VideoBlocked,
    VideoUnavailable,
    NoFormat,
    NotFound,
    YtdlpError,
}

impl UpstreamErrorCode {
    /// HTTP status this code should be surfaced as.
    pub fn http_status(self) -> u16 {
        match self {
            UpstreamErrorCode::NotFound => 404,
            _ => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UpstreamErrorCode::VideoPrivate => "VIDEO_PRIVATE",
            UpstreamErrorCode::VideoRestricted => "VIDEO_RESTRICTED",
            UpstreamErrorCode::VideoBlocked => "VIDEO_BLOCKED",
            UpstreamErrorCode::VideoUnavailable => "VIDEO_UNAVAILABLE",
            UpstreamErrorCode::NoFormat => "NO_FORMAT",
            UpstreamErrorCode::NotFound => "NOT_FOUND",
            UpstreamErrorCode::YtdlpError => "YTDLP_ERROR",
        }
    }
}

/// Classifies a `yt-dlp` stderr tail into one of the taxonomy's upstream
/// failure codes. Falls back to `YtdlpError` for anything unrecognized.
pub fn classify_stderr(stderr: &str) -> UpstreamErrorCode {
    let lower = stderr.to_lowercase();
    if lower.contains("private video") {
        UpstreamErrorCode::VideoPrivate
    } else if lower.contains("age-restricted") || lower.contains("sign in to confirm") {
        UpstreamErrorCode::VideoRestricted
    } else if lower.contains("blocked it") || lower.contains("not available in your country") {
        UpstreamErrorCode::VideoBlocked
    } else if lower.contains("video unavailable") {
        UpstreamErrorCode::VideoUnavailable
    } else if lower.contains("requested format is not available") {
        UpstreamErrorCode::NoFormat
    } else if lower.contains("unable to download webpage") || lower.contains("404") {
        UpstreamErrorCode::NotFound
    } else {
        UpstreamErrorCode::YtdlpError
    }
}

/// Error returned by an [`ExternalFetcher`] implementation.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream failure [{code}]: {message}", code = .0.as_str())]
    Upstream(UpstreamErrorCode, String),
    #[error("fetcher process error: {0}")]
    Process(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FetchError {
    pub fn code(&self) -> Option<UpstreamErrorCode> {
        match self {
            FetchError::Upstream(code, _) => Some(*code),
            _ => None,
        }
    }
}

/// The external video/audio fetcher + transcoder boundary, per the design
/// notes' `{getMetadata, createTranscodedStream, getPlaylistItems,
/// checkAvailable, parseError}` interface. Production code implements this by
/// shelling out to `yt-dlp`/`ffmpeg`; tests implement it with canned data.
#[async_trait]
pub trait ExternalFetcher: Send + Sync {
    /// Resolves title/duration/thumbnail for a single source url.
    async fn get_metadata(&self, url: &str) -> Result<TrackMetadata, FetchError>;

    /// Starts a transcoded audio byte stream for a source url. Returns a
    /// boxed `AsyncRead` so callers can tee it into an on-disk cache file
    /// while also serving it live.
    async fn create_transcoded_stream(
        &self,
        url: &str,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>, FetchError>;

    /// Resolves a playlist url (one containing a `list=` query parameter)
    /// into its constituent items.
    async fn get_playlist_items(&self, url: &str) -> Result<Vec<PlaylistItem>, FetchError>;

    /// Cheap liveness/availability probe for `/health`.
    async fn check_available(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_private_video() {
        let code = classify_stderr("ERROR: [youtube] abc123: Private video. Sign in if you've been granted access");
        assert_eq!(code, UpstreamErrorCode::VideoPrivate);
    }

    #[test]
    fn classifies_unknown_as_generic() {
        let code = classify_stderr("some unrelated ffmpeg noise");
        assert_eq!(code, UpstreamErrorCode::YtdlpError);
        assert_eq!(code.http_status(), 500);
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(UpstreamErrorCode::NotFound.http_status(), 404);
    }
}
