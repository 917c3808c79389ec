//! Component J: the HTTP Surface. REST endpoints for health/version, audio
//! metadata + streaming, lobby listing/creation, cover images, and playlists,
//! composed into one `axum::Router<AppState>` plus the OpenAPI document that
//! describes it — the same `utoipa::OpenApi` + `add_openapi` pattern every
//! `pmo*` API crate uses.

pub mod covers;
pub mod dashboard;
pub mod error;
pub mod health;
pub mod lobbies;
pub mod metadata;
pub mod playlists;
pub mod state;
pub mod stream;

pub use state::AppState;

use axum::routing::get;
use axum::Router;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::version,
        metadata::metadata,
        lobbies::list_lobbies,
        lobbies::create_lobby,
        lobbies::get_lobby,
        playlists::list_playlists,
        playlists::create_playlist,
        playlists::get_playlist,
    ),
    components(schemas(
        error::ErrorResponse,
        health::HealthResponse,
        health::SongCacheStatus,
        health::VersionResponse,
        metadata::MetadataResponse,
        lobbies::LobbiesResponse,
        lobbies::LobbySummary,
        lobbies::CreateLobbyRequest,
        lobbies::CreateLobbyResponse,
        lobbies::LobbyDetail,
        lobbies::LobbyUser,
        playlists::CreatePlaylistRequest,
        playlists::RenamePlaylistRequest,
        playlists::AddSongRequest,
    )),
    tags(
        (name = "health", description = "Liveness and build identity"),
        (name = "lobbies", description = "Lobby listing, creation, and detail"),
        (name = "playlists", description = "Per-user saved song collections"),
    ),
    info(
        title = "co-listening server API",
        version = "0.1.0",
        description = "REST surface for the co-listening server: everything outside the realtime websocket protocol."
    )
)]
pub struct ApiDoc;

/// Builds the full HTTP Surface router, nested the way §6's paths are laid
/// out: bare routes at the root (`/health`, `/api/version`,
/// `/api/metadata`, `/api/stream`), resource routers nested under their own
/// prefix.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/version", get(health::version))
        .route("/api/metadata", get(metadata::metadata))
        .route("/api/stream", get(stream::stream))
        .route("/api/covers/{id}", get(covers::cover))
        .nest("/api/lobbies", lobbies::router())
        .nest("/api/playlists", playlists::router())
}

/// Returns the router plus its OpenAPI document, for callers (the `colisten`
/// binary) that want to mount both through `clserver::Server::add_openapi`.
pub fn router_and_docs() -> (Router<AppState>, utoipa::openapi::OpenApi) {
    (router(), ApiDoc::openapi())
}
