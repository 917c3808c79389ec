//! `GET/POST /api/lobbies`, `GET /api/lobbies/:id`.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use cllobby::{ListeningMode, UserMode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_lobbies).post(create_lobby))
        .route("/{id}", get(get_lobby))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LobbySummary {
    pub id: String,
    pub name: Option<String>,
    #[schema(value_type = String)]
    pub listening_mode: ListeningMode,
    pub user_count: usize,
    pub song_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LobbiesResponse {
    pub lobbies: Vec<LobbySummary>,
}

#[utoipa::path(
    get,
    path = "/api/lobbies",
    tag = "lobbies",
    responses((status = 200, description = "All live lobbies", body = LobbiesResponse))
)]
pub async fn list_lobbies(State(state): State<AppState>) -> Json<LobbiesResponse> {
    let lobbies = state
        .gateway
        .lobbies
        .get_all_lobbies()
        .iter()
        .map(|h| LobbySummary {
            id: h.id(),
            name: h.name(),
            listening_mode: h.listening_mode(),
            user_count: h.user_count(),
            song_count: h.songs().len(),
            created_at: h.created_at(),
        })
        .collect();

    Json(LobbiesResponse { lobbies })
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateLobbyRequest {
    pub name: Option<String>,
    #[schema(value_type = Option<String>)]
    pub listening_mode: Option<ListeningMode>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateLobbyResponse {
    pub id: String,
    pub link: String,
}

#[utoipa::path(
    post,
    path = "/api/lobbies",
    tag = "lobbies",
    request_body = CreateLobbyRequest,
    responses(
        (status = 200, description = "Lobby created", body = CreateLobbyResponse),
        (status = 400, description = "Invalid name", body = crate::error::ErrorResponse),
    )
)]
pub async fn create_lobby(
    State(state): State<AppState>,
    Json(req): Json<CreateLobbyRequest>,
) -> Result<Json<CreateLobbyResponse>, AppError> {
    let handle = state.gateway.lobbies.create_lobby(
        None,
        None,
        req.listening_mode.unwrap_or(ListeningMode::Synchronized),
        req.name,
    )?;

    let id = handle.id();
    Ok(Json(CreateLobbyResponse {
        link: format!("/lobby/{id}"),
        id,
    }))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LobbyUser {
    pub conn_id: String,
    pub username: String,
    pub emoji: Option<String>,
    pub joined_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub mode: UserMode,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LobbyDetail {
    pub id: String,
    pub user_count: usize,
    pub users: Vec<LobbyUser>,
}

#[utoipa::path(
    get,
    path = "/api/lobbies/{id}",
    tag = "lobbies",
    params(("id" = String, Path, description = "Lobby id")),
    responses(
        (status = 200, description = "Lobby detail", body = LobbyDetail),
        (status = 404, description = "No such lobby", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_lobby(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LobbyDetail>, AppError> {
    let handle = state
        .gateway
        .lobbies
        .get_lobby(&id)
        .ok_or_else(|| AppError::NotFound(format!("lobby '{id}' not found")))?;

    let users = handle
        .snapshot_users()
        .into_iter()
        .map(|u| LobbyUser {
            conn_id: u.conn_id,
            username: u.username,
            emoji: u.emoji,
            joined_at: u.joined_at,
            mode: u.mode,
        })
        .collect::<Vec<_>>();

    Ok(Json(LobbyDetail {
        id: handle.id(),
        user_count: users.len(),
        users,
    }))
}
