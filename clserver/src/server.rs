//! A small Axum wrapper, trimmed from `pmoserver::server::Server`: the
//! route-composition builder, OpenAPI/Swagger mounting, and graceful
//! shutdown survive; the UPnP-era embedded-static-assets methods
//! (`add_dir`/`add_spa`) don't, since serving a built frontend is out of
//! this system's scope (the frontend is a separate origin reached via
//! `FRONTEND_URL`, not bundled into this binary).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::handler::Handler;
use axum::response::Redirect;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::DashboardCredentials;
use crate::logs::{init_logging, log_dump, log_sse, LogState, LoggingOptions};

/// Graceful-shutdown hard-kill bound, per the concurrency model's "hard-kill
/// after 10s" rule.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Clone, Serialize, utoipa::ToSchema)]
pub struct ServerInfo {
    pub name: String,
    pub base_url: String,
    pub port: u16,
}

pub struct Server {
    name: String,
    base_url: String,
    port: u16,
    router: Arc<RwLock<Router>>,
    join_handle: Option<JoinHandle<()>>,
    shutdown: Arc<tokio::sync::Notify>,
    log_state: Option<LogState>,
}

impl Server {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, port: u16) -> Self {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        Self {
            name: name.into(),
            base_url: base_url.into(),
            port,
            router: Arc::new(RwLock::new(Router::new().layer(cors))),
            join_handle: None,
            shutdown: Arc::new(tokio::sync::Notify::new()),
            log_state: None,
        }
    }

    /// Merges a fully-formed router at an absolute path (`/` merges at root,
    /// anything else nests under it), following `pmoserver::Server`'s
    /// `add_router`/`mem::take` merge trick to dodge `Router` not being `Copy`.
    pub async fn add_router(&self, path: &str, route: Router) {
        let mut r = self.router.write().await;
        let current = std::mem::take(&mut *r);
        *r = if path == "/" || path.is_empty() {
            current.merge(route)
        } else {
            let normalized = format!("/{}", path.trim_start_matches('/'));
            current.nest(&normalized, route)
        };
    }

    pub async fn add_handler<H, T>(&self, path: &str, handler: H)
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        let route = Router::new().route("/", get(handler));
        self.add_router(path, route).await;
    }

    pub async fn add_redirect(&self, from: &str, to: &str) {
        let to = to.to_string();
        let handler = move || {
            let to = to.clone();
            async move { Redirect::permanent(&to) }
        };
        let route = Router::new().route("/", get(handler));
        self.add_router(from, route).await;
    }

    /// Mounts an OpenAPI-documented router at `/api/{name}` plus its Swagger
    /// UI at `/swagger-ui/{name}`, exactly as `pmoserver::Server::add_openapi`
    /// does for each per-crate API doc.
    pub async fn add_openapi(&self, api_router: Router, openapi: utoipa::openapi::OpenApi, name: &str) {
        let swagger_path = format!("/swagger-ui/{name}");
        let openapi_json_path = format!("/api-docs/{name}.json");
        let swagger = SwaggerUi::new(swagger_path).url(openapi_json_path, openapi);

        let base_path = format!("/api/{name}");
        let nested = Router::new().nest(&base_path, api_router);

        let mut r = self.router.write().await;
        let current = std::mem::take(&mut *r);
        *r = current.merge(nested).merge(swagger);
    }

    /// Initializes `tracing` and mounts the dashboard's log endpoints,
    /// gated behind Basic auth when `credentials` is given.
    pub async fn init_logging(&mut self, options: LoggingOptions, credentials: Option<DashboardCredentials>) {
        let log_state = init_logging(options);
        let mut route = Router::new()
            .route("/logs", get(log_sse))
            .route("/logs/dump", get(log_dump))
            .with_state(log_state.clone());
        if let Some(credentials) = credentials {
            route = route.layer(axum::middleware::from_fn_with_state(
                credentials,
                crate::auth::require_basic_auth,
            ));
        }
        self.add_router("/api/dashboard", route).await;
        self.log_state = Some(log_state);
    }

    /// Binds and starts serving, racing ctrl-c/SIGTERM/a programmatic
    /// [`Self::request_shutdown`] against the accept loop — the same shape
    /// as `pmoserver::Server::start`, with the signal set widened to match
    /// the graceful-shutdown rule here (stop accepting, drain,
    /// hard-kill after 10s).
    pub async fn start(&mut self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!(name = %self.name, %addr, "starting HTTP server");

        let router = self.router.read().await.clone();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let shutdown = self.shutdown.clone();

        self.join_handle = Some(tokio::spawn(async move {
            let serve = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(shutdown_signal(shutdown));
            match tokio::time::timeout(SHUTDOWN_GRACE + Duration::from_secs(5), serve).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("server exited with error: {e}"),
                Err(_) => tracing::warn!("server did not shut down within the grace period"),
            }
        }));
        Ok(())
    }

    /// Triggers the same graceful-shutdown path a ctrl-c would, for tests and
    /// programmatic restarts.
    pub fn request_shutdown(&self) {
        self.shutdown.notify_waiters();
    }

    pub async fn wait(&mut self) {
        if let Some(h) = self.join_handle.take() {
            let _ = h.await;
        }
    }

    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            port: self.port,
        }
    }
}

async fn shutdown_signal(notify: Arc<tokio::sync::Notify>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler")
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = notify.notified() => {},
    }
    info!("shutdown signal received, draining connections");
}

pub struct ServerBuilder {
    name: String,
    base_url: String,
    port: u16,
}

impl ServerBuilder {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            port,
        }
    }

    pub fn build(self) -> Server {
        Server::new(self.name, self.base_url, self.port)
    }
}
