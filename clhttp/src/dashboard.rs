//! Admin-only song cache management for the dashboard (§4.B's
//! `getAllSongs`/`deleteSong`/`deleteAllSongs` operations), mounted by
//! `colisten` under `/api/dashboard` behind the same Basic-auth guard as
//! the log endpoints. Kept in its own module rather than `lobbies.rs`'s
//! style because it isn't part of the public REST surface §6 enumerates by
//! path — it's reached only through the guarded dashboard prefix.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/songs", get(list_songs).delete(delete_all_songs))
        .route("/songs/{id}", axum::routing::delete(delete_song))
}

async fn list_songs(State(state): State<AppState>) -> Result<Json<Vec<clsongcache::CachedSongRow>>, AppError> {
    Ok(Json(state.gateway.songs.get_all_songs()?))
}

async fn delete_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<axum::http::StatusCode, AppError> {
    state.gateway.songs.delete_song(&id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn delete_all_songs(State(state): State<AppState>) -> Result<axum::http::StatusCode, AppError> {
    state.gateway.songs.delete_all_songs().await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
