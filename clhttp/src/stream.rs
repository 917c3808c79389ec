//! `GET /api/stream?q=...`: serves a range-aware response from the on-disk
//! cache when a ready, non-empty file exists, otherwise falls back to a
//! live-transcoded chunked stream.
//!
//! The live path tees the single fetcher stream into the cache file as it's
//! forwarded to the client (`clcache::TeeReader`, the same mechanism the
//! reference pack's `youtube_pipeline.rs` uses), rather than kicking off a
//! second, independent fetcher invocation the way a plain background
//! `startDownload` would — one client consumes the bytes, the cache fills
//! from the same copy.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use clsongcache::SongCache;
use clstore::SongStatus;
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, ReadBuf};
use tokio_util::io::ReaderStream;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

const CONTENT_TYPE: &str = "audio/mpeg";

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub q: Option<String>,
}

pub async fn stream(
    State(state): State<AppState>,
    Query(params): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let q = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| AppError::Validation("q is required".to_string()))?;

    if let Some(row) = state.gateway.songs.get_cached_song(&q)? {
        if row.status == SongStatus::Ready {
            if let Some(path) = &row.file_path {
                if tokio::fs::metadata(path).await.is_ok() {
                    return serve_cached(&state, path, &headers).await;
                }
            }
        }
    }

    live_transcode(&state, &q).await
}

async fn serve_cached(state: &AppState, path: &str, headers: &HeaderMap) -> Result<Response, AppError> {
    let (mut file, size) = state.gateway.songs.open_cached_stream(path).await?;

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_range(v, size));

    match range {
        Some(None) => Ok(StatusCode::RANGE_NOT_SATISFIABLE.into_response()),
        Some(Some((start, end))) => {
            file.seek(std::io::SeekFrom::Start(start)).await.map_err(anyhow::Error::from)?;
            let len = end - start + 1;
            let body = Body::from_stream(ReaderStream::new(file.take(len)));
            Ok((
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, CONTENT_TYPE.to_string()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (header::CONTENT_LENGTH, len.to_string()),
                    (header::CONTENT_RANGE, format!("bytes {start}-{end}/{size}")),
                    (header::CACHE_CONTROL, "public, max-age=31536000".to_string()),
                ],
                body,
            )
                .into_response())
        }
        None => {
            let body = Body::from_stream(ReaderStream::new(file));
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, CONTENT_TYPE.to_string()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (header::CONTENT_LENGTH, size.to_string()),
                    (header::CACHE_CONTROL, "public, max-age=31536000".to_string()),
                ],
                body,
            )
                .into_response())
        }
    }
}

async fn live_transcode(state: &AppState, q: &str) -> Result<Response, AppError> {
    let reader = state.gateway.fetcher.create_transcoded_stream(q).await?;

    let body = match state.gateway.songs.reserve_live_cache(q, None).await {
        Some((id, path)) => {
            let file = tokio::fs::File::create(&path).await.map_err(anyhow::Error::from)?;
            let tee = clcache::TeeReader::new(reader, file);
            let completing = CompletingTee::new(tee, Arc::clone(&state.gateway.songs), q.to_string(), id);
            Body::from_stream(ReaderStream::new(completing))
        }
        None => {
            warn!(url = %q, "live stream will not be cached: row already claimed or store unavailable");
            Body::from_stream(ReaderStream::new(reader))
        }
    };

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, CONTENT_TYPE.to_string()),
            (header::TRANSFER_ENCODING, "chunked".to_string()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        body,
    )
        .into_response())
}

/// Wraps a [`clcache::TeeReader`] so that once the live-transcoded stream
/// reaches EOF (or errors), the row [`SongCache::reserve_live_cache`]
/// claimed is finalized exactly once — `ready` if any bytes made it
/// through, `error` otherwise.
struct CompletingTee<R> {
    inner: clcache::TeeReader<R, tokio::fs::File>,
    songs: Arc<SongCache>,
    url: String,
    id: String,
    wrote_any: bool,
    finished: bool,
}

impl<R> CompletingTee<R> {
    fn new(inner: clcache::TeeReader<R, tokio::fs::File>, songs: Arc<SongCache>, url: String, id: String) -> Self {
        Self {
            inner,
            songs,
            url,
            id,
            wrote_any: false,
            finished: false,
        }
    }

    fn finish(&mut self, result: std::result::Result<(), String>) {
        if self.finished {
            return;
        }
        self.finished = true;
        let songs = Arc::clone(&self.songs);
        let url = self.url.clone();
        let id = self.id.clone();
        tokio::spawn(async move {
            songs.finish_live_cache(&url, &id, result).await;
        });
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for CompletingTee<R> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(Ok(()));
        }
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        match &poll {
            Poll::Ready(Ok(())) => {
                if buf.filled().len() > before {
                    this.wrote_any = true;
                } else {
                    let wrote_any = this.wrote_any;
                    this.finish(if wrote_any {
                        Ok(())
                    } else {
                        Err("transcoded stream produced an empty file".to_string())
                    });
                }
            }
            Poll::Ready(Err(e)) => this.finish(Err(e.to_string())),
            Poll::Pending => {}
        }
        poll
    }
}

/// Parses a single-range `Range: bytes=start-end` header against a known
/// file size. `Some(None)` means a header was present but unsatisfiable;
/// `None` means no range was requested (or it didn't parse, which we treat
/// the same as "serve the whole file").
fn parse_range(header: &str, size: u64) -> Option<Option<(u64, u64)>> {
    let spec = header.strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;

    let start: u64 = if start.is_empty() { 0 } else { start.parse().ok()? };
    let end: u64 = if end.is_empty() {
        size.saturating_sub(1)
    } else {
        end.parse().ok()?
    };

    if start >= size || start > end {
        return Some(None);
    }
    Some(Some((start, end.min(size.saturating_sub(1)))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_range_request_is_parsed() {
        assert_eq!(parse_range("bytes=0-99", 1000), Some(Some((0, 99))));
    }

    #[test]
    fn open_ended_range_clamps_to_size() {
        assert_eq!(parse_range("bytes=900-", 1000), Some(Some((900, 999))));
    }

    #[test]
    fn out_of_bounds_start_is_unsatisfiable() {
        assert_eq!(parse_range("bytes=5000-", 1000), Some(None));
    }

    #[test]
    fn malformed_header_is_ignored() {
        assert_eq!(parse_range("not-a-range", 1000), None);
    }
}
