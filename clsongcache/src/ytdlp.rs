//! Concrete `yt-dlp | ffmpeg` implementation of [`clmetadata::ExternalFetcher`].
//!
//! Grounded in `williammartin-gezellig/src-tauri/src/youtube_pipeline.rs`'s
//! `YtDlpSource`: metadata via a `--dump-json` invocation, audio via a piped
//! `yt-dlp | ffmpeg` shell pipeline whose stdout is streamed straight back to
//! the caller. The url is shell-quoted before interpolation — the reference
//! implementation trusted its inputs, but here the url comes straight from a
//! `queue:add` websocket payload, so it cannot be pasted unescaped into `sh -c`.

use std::process::Stdio;

use async_trait::async_trait;
use clmetadata::{classify_stderr, ExternalFetcher, FetchError, PlaylistItem, TrackMetadata};
use tokio::io::AsyncRead;
use tokio::process::Command;

pub struct YtDlpFetcher;

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self
    }
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn tail(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().skip(s.chars().count() - max_chars).collect()
    }
}

#[async_trait]
impl ExternalFetcher for YtDlpFetcher {
    async fn get_metadata(&self, url: &str) -> Result<TrackMetadata, FetchError> {
        let output = Command::new("yt-dlp")
            .args(["--dump-json", "--no-playlist", url])
            .output()
            .await
            .map_err(|e| FetchError::Process(e.to_string()))?;

        if !output.status.success() {
            let stderr = tail(&String::from_utf8_lossy(&output.stderr), 200);
            return Err(FetchError::Upstream(classify_stderr(&stderr), stderr));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| FetchError::Process(format!("bad yt-dlp json: {e}")))?;

        Ok(TrackMetadata {
            title: json
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown title")
                .to_string(),
            duration: json.get("duration").and_then(|v| v.as_f64()).unwrap_or(0.0),
            source_url: url.to_string(),
            thumbnail_url: json
                .get("thumbnail")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }

    async fn create_transcoded_stream(
        &self,
        url: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, FetchError> {
        let pipeline = format!(
            "yt-dlp -f bestaudio -o - {} | ffmpeg -loglevel error -i pipe:0 -vn -f mp3 -",
            shell_quote(url)
        );
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(pipeline)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| FetchError::Process(e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FetchError::Process("missing stdout on fetcher child".to_string()))?;

        // Reap the child in the background once the stream is fully
        // consumed/dropped so it never becomes a zombie.
        tokio::spawn(async move {
            let _ = child.wait().await;
        });

        Ok(Box::new(stdout))
    }

    async fn get_playlist_items(&self, url: &str) -> Result<Vec<PlaylistItem>, FetchError> {
        let output = Command::new("yt-dlp")
            .args(["--dump-json", "--flat-playlist", url])
            .output()
            .await
            .map_err(|e| FetchError::Process(e.to_string()))?;

        if !output.status.success() {
            let stderr = tail(&String::from_utf8_lossy(&output.stderr), 200);
            return Err(FetchError::Upstream(classify_stderr(&stderr), stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let items = stdout
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
            .map(|json| PlaylistItem {
                url: json
                    .get("url")
                    .or_else(|| json.get("webpage_url"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                title: json
                    .get("title")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Unknown title")
                    .to_string(),
                duration: json.get("duration").and_then(|v| v.as_f64()).unwrap_or(0.0),
                thumbnail_url: json
                    .get("thumbnail")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
            })
            .collect();

        Ok(items)
    }

    async fn check_available(&self) -> bool {
        Command::new("yt-dlp")
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's a test"), r"'it'\''s a test'");
    }

    #[test]
    fn tail_truncates_from_the_end() {
        let long = "a".repeat(300);
        assert_eq!(tail(&long, 200).len(), 200);
    }
}
