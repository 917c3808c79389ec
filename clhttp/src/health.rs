//! `GET /health` and `GET /api/version`.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct SongCacheStatus {
    pub available: bool,
    pub cached_songs: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub uptime: f64,
    pub ytdlp: bool,
    pub database: bool,
    pub song_cache: SongCacheStatus,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service health snapshot", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let ytdlp = state.gateway.fetcher.check_available().await;
    let database = state.store.is_available();
    let cached_songs = state.gateway.songs.get_all_songs().map(|rows| rows.len()).unwrap_or(0);

    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        ytdlp,
        database,
        song_cache: SongCacheStatus {
            available: database,
            cached_songs,
        },
    })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VersionResponse {
    pub version: String,
    pub name: String,
}

#[utoipa::path(
    get,
    path = "/api/version",
    tag = "health",
    responses((status = 200, description = "Build identity", body = VersionResponse))
)]
pub async fn version(State(state): State<AppState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        version: state.version.to_string(),
        name: state.name.to_string(),
    })
}
