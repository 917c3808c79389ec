//! `/api/playlists` CRUD, scoped to a caller-supplied user id.
//!
//! A playlist is owned by a user id, but nothing names an authentication
//! mechanism anywhere in the external interface — there is no session/login
//! surface to derive an identity from. Rather than
//! inventing one, the caller supplies its opaque id directly via an
//! `X-User-Id` header, which every handler here requires; its absence is a
//! `ValidationError` (400), matching how this crate already treats other
//! missing-required-input cases.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use clplaylist::NewPlaylistSong;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_playlists).post(create_playlist))
        .route(
            "/{id}",
            get(get_playlist).patch(rename_playlist).delete(delete_playlist),
        )
        .route("/{id}/songs", post(add_song))
        .route("/{id}/songs/{song_id}", axum::routing::delete(remove_song))
}

fn user_id(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Validation("X-User-Id header is required".to_string()))
}

#[utoipa::path(
    get,
    path = "/api/playlists",
    tag = "playlists",
    responses(
        (status = 200, description = "This user's playlists"),
        (status = 400, description = "Missing X-User-Id", body = crate::error::ErrorResponse),
        (status = 503, description = "Persistence unavailable", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_playlists(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<clplaylist::PlaylistRow>>, AppError> {
    let user_id = user_id(&headers)?;
    if !state.playlists.is_available() {
        return Err(AppError::Unavailable);
    }
    Ok(Json(state.playlists.list_playlists(user_id)?))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePlaylistRequest {
    pub name: String,
}

#[utoipa::path(
    post,
    path = "/api/playlists",
    tag = "playlists",
    request_body = CreatePlaylistRequest,
    responses(
        (status = 200, description = "Playlist created"),
        (status = 503, description = "Persistence unavailable", body = crate::error::ErrorResponse),
    )
)]
pub async fn create_playlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreatePlaylistRequest>,
) -> Result<Json<clplaylist::PlaylistRow>, AppError> {
    let user_id = user_id(&headers)?;
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    Ok(Json(state.playlists.create_playlist(user_id, req.name.trim())?))
}

#[utoipa::path(
    get,
    path = "/api/playlists/{id}",
    tag = "playlists",
    params(("id" = String, Path, description = "Playlist id")),
    responses(
        (status = 200, description = "Playlist with its songs"),
        (status = 404, description = "No such playlist", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<clplaylist::PlaylistDetail>, AppError> {
    Ok(Json(state.playlists.get_playlist(&id)?))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RenamePlaylistRequest {
    pub name: String,
}

pub async fn rename_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RenamePlaylistRequest>,
) -> Result<Json<clplaylist::PlaylistDetail>, AppError> {
    state.playlists.rename_playlist(&id, req.name.trim())?;
    Ok(Json(state.playlists.get_playlist(&id)?))
}

pub async fn delete_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<axum::http::StatusCode, AppError> {
    state.playlists.delete_playlist(&id)?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddSongRequest {
    pub url: String,
    pub title: String,
    pub duration: f64,
    pub thumbnail: Option<String>,
}

pub async fn add_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AddSongRequest>,
) -> Result<Json<clplaylist::PlaylistSongRow>, AppError> {
    let song = state.playlists.add_song(
        &id,
        NewPlaylistSong {
            url: req.url,
            title: req.title,
            duration: req.duration,
            thumbnail: req.thumbnail,
        },
    )?;
    Ok(Json(song))
}

pub async fn remove_song(
    State(state): State<AppState>,
    Path((id, song_id)): Path<(String, String)>,
) -> Result<axum::http::StatusCode, AppError> {
    state.playlists.remove_song(&id, &song_id)?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
