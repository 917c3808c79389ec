//! A small Axum server wrapper, trimmed and generalized from
//! `pmoserver::server::Server`.

pub mod auth;
pub mod logs;
pub mod server;

pub use auth::{require_basic_auth, DashboardCredentials};
pub use logs::{LogState, LoggingOptions};
pub use server::{Server, ServerBuilder, ServerInfo};
