//! Binary entry point: wires the components of §2's table into one running
//! process, the same phased-startup shape as `PMOMusic::main`
//! (infrastructure, then business registration, then serve-and-wait) with
//! the UPnP-specific phases replaced by this system's own component graph.

use std::sync::Arc;

use clconfig::get_config;
use clcovers::CoverCache;
use clgateway::Gateway;
use cllobby::LobbyRegistry;
use clmetadata::ExternalFetcher;
use clplaylist::PlaylistStore;
use clserver::{DashboardCredentials, LoggingOptions, ServerBuilder};
use clsongcache::{ytdlp::YtDlpFetcher, SongCache};
use clstore::Store;
use tracing::{info, warn};
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== Phase 1: configuration + persistence ==========
    let config = get_config();

    let store = Store::open(config.database_url.as_deref())?;
    if !store.is_available() {
        warn!("DATABASE_URL not set; running memory-only (queue/playback/chat survive only while the process is up)");
    }

    // ========== Phase 2: component registry ==========
    let fetcher: Arc<dyn ExternalFetcher> = Arc::new(YtDlpFetcher::default());

    let lobbies = LobbyRegistry::new(store.clone());

    let songs = SongCache::new(store.clone(), config.songs_path.clone(), Arc::clone(&fetcher));
    songs.init().await?;

    let covers = Arc::new(CoverCache::new(config.covers_dir.clone()));
    covers.init().await?;

    let playlists = PlaylistStore::new(store.clone());

    let gateway = Gateway::new(Arc::clone(&lobbies), Arc::clone(&songs), Arc::clone(&covers), fetcher);

    // Background timers: playback sync loops are spawned per-lobby on
    // demand by `cllobby` itself; these three are the process-wide ones
    // named in §5 (lobby cleanup every 60s, song-cache TTL sweep every 6h).
    let _cleanup_sweep = lobbies.spawn_cleanup_sweep();
    let _ttl_sweep = songs.spawn_ttl_sweep();

    // ========== Phase 3: HTTP + realtime surface ==========
    let app_state = clhttp::AppState::new(
        Arc::clone(&gateway),
        playlists,
        store,
        "colisten",
        env!("CARGO_PKG_VERSION"),
    );

    let (rest_router, openapi) = clhttp::router_and_docs();
    let swagger = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi);

    let ws_router = axum::Router::new()
        .route("/ws", axum::routing::get(clgateway::ws_handler))
        .with_state(gateway);

    let app_router = rest_router
        .with_state(app_state.clone())
        .merge(ws_router)
        .merge(swagger);

    let mut server = ServerBuilder::new("colisten", format!("http://0.0.0.0:{}", config.port), config.port).build();

    let dashboard_creds = DashboardCredentials::new(config.dashboard_user.clone(), config.dashboard_pass.clone());
    server
        .init_logging(LoggingOptions::default(), Some(dashboard_creds.clone()))
        .await;

    // Song cache admin (§4.B's getAllSongs/deleteSong/deleteAllSongs), gated
    // behind the same Basic-auth credentials as the dashboard's log feed.
    let admin_router = clhttp::dashboard::router()
        .with_state(app_state)
        .layer(axum::middleware::from_fn_with_state(
            dashboard_creds,
            clserver::require_basic_auth,
        ));
    server.add_router("/api/dashboard", admin_router).await;

    server.add_router("/", app_router).await;

    info!(port = config.port, "starting co-listening server");
    server.start().await?;
    server.wait().await;

    info!("colisten stopped");
    Ok(())
}
