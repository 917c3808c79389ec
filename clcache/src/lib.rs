//! Shared pieces of the on-disk caching infrastructure: a tee'ing `AsyncRead`
//! (used by the song cache to fill a file while streaming live) and a small
//! HTTP download helper (used by the cover cache).
//!
//! Grounded in `pmocache::download`'s `peek_header`/streaming helpers and in
//! the `TeeReader` pattern used for live-transcoded audio in the reference
//! pack's `youtube_pipeline.rs`.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tracing::warn;

/// Wraps an `AsyncRead` so every chunk read through it is also appended to a
/// second `AsyncWrite` sink (typically an on-disk cache file). Write errors on
/// the tee side are logged and otherwise ignored — the cache is
/// best-effort, the live stream to the client is not.
pub struct TeeReader<R, W> {
    inner: R,
    sink: W,
}

impl<R, W> TeeReader<R, W> {
    pub fn new(inner: R, sink: W) -> Self {
        Self { inner, sink }
    }
}

impl<R, W> AsyncRead for TeeReader<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            let filled = &buf.filled()[before..];
            if !filled.is_empty() {
                // Best-effort synchronous-ish tee: a bounded poll_write on an
                // already-open file essentially always completes immediately,
                // matching the reference tee's fire-and-forget write.
                let mut sink = Pin::new(&mut this.sink);
                let mut cursor = 0usize;
                while cursor < filled.len() {
                    match sink.as_mut().poll_write(cx, &filled[cursor..]) {
                        Poll::Ready(Ok(0)) => break,
                        Poll::Ready(Ok(n)) => cursor += n,
                        Poll::Ready(Err(e)) => {
                            warn!("cache tee write failed: {e}");
                            break;
                        }
                        Poll::Pending => break,
                    }
                }
            }
        }
        poll
    }
}

/// Reads the whole body of `url` into memory with a timeout, following at
/// most one HTTP redirect, and returns the bytes plus the response's
/// `Content-Type` header (if any). Used by the cover cache, whose images are
/// small enough that buffering in memory is acceptable.
pub async fn download_bytes(
    url: &str,
    timeout: Duration,
) -> anyhow::Result<(bytes::Bytes, Option<String>)> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(1))
        .timeout(timeout)
        .build()?;

    let response = client.get(url).send().await?.error_for_status()?;
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let bytes = response.bytes().await?;
    Ok((bytes, content_type))
}

/// Drains an `AsyncRead` into a `Vec<u8>`, used in tests and by callers that
/// already have a small in-memory stream to persist.
pub async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt as _;

    #[tokio::test]
    async fn tee_reader_copies_to_sink() {
        let source = std::io::Cursor::new(b"hello world".to_vec());
        let mut sink_buf = Vec::new();
        let sink = std::io::Cursor::new(&mut sink_buf);
        let tee = TeeReader::new(source, sink);
        let data = read_all(tee).await.unwrap();
        assert_eq!(data, b"hello world");
        assert_eq!(sink_buf, b"hello world");
    }

    #[tokio::test]
    async fn tee_reader_handles_empty_input() {
        let source = std::io::Cursor::new(Vec::<u8>::new());
        let mut sink_buf = Vec::new();
        let mut sink = std::io::Cursor::new(&mut sink_buf);
        let tee = TeeReader::new(source, &mut sink);
        let data = read_all(tee).await.unwrap();
        assert!(data.is_empty());
        let _ = sink.flush().await;
    }
}
