//! Process-wide configuration for the co-listening server.
//!
//! Unlike `pmoconfig`'s YAML-merge layer, this crate's surface is just the
//! environment variables enumerated in the system's external interface: there
//! is no on-disk config file to merge, so the shape is simpler, but the access
//! pattern — a typed snapshot behind a process-wide singleton — is the same.
//!
//! ```no_run
//! use clconfig::get_config;
//!
//! let config = get_config();
//! println!("listening on {}", config.port);
//! ```

use std::path::PathBuf;
use std::sync::OnceLock;

use rand::Rng;
use tracing::{info, warn};

/// Env var names, kept as constants so call sites never hand-roll a string.
pub mod env_vars {
    pub const PORT: &str = "PORT";
    pub const FRONTEND_URL: &str = "FRONTEND_URL";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const SONGS_PATH: &str = "SONGS_PATH";
    pub const COVERS_DIR: &str = "COVERS_DIR";
    pub const DASHBOARD_USER: &str = "DASHBOARD_USER";
    pub const DASHBOARD_PASS: &str = "DASHBOARD_PASS";
    pub const SPOTIFY_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";
    pub const SPOTIFY_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";
}

const DEFAULT_PORT: u16 = 8080;

/// Immutable configuration snapshot, built once at startup from the process
/// environment and handed out by reference from [`get_config`].
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub frontend_url: Option<String>,
    pub database_url: Option<PathBuf>,
    pub songs_path: PathBuf,
    pub covers_dir: PathBuf,
    pub dashboard_user: String,
    pub dashboard_pass: String,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
}

impl Config {
    /// Loads configuration from the process environment, applying the same
    /// defaults the HTTP surface and song cache rely on.
    pub fn from_env() -> Self {
        let port = std::env::var(env_vars::PORT)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let frontend_url = std::env::var(env_vars::FRONTEND_URL).ok();
        let database_url = std::env::var(env_vars::DATABASE_URL).ok().map(PathBuf::from);

        let songs_path = std::env::var(env_vars::SONGS_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_state_dir().join("songs"));

        let covers_dir = std::env::var(env_vars::COVERS_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_state_dir().join("covers"));

        let (dashboard_user, dashboard_pass) = dashboard_credentials();

        Self {
            port,
            frontend_url,
            database_url,
            songs_path,
            covers_dir,
            dashboard_user,
            dashboard_pass,
            spotify_client_id: std::env::var(env_vars::SPOTIFY_CLIENT_ID).ok(),
            spotify_client_secret: std::env::var(env_vars::SPOTIFY_CLIENT_SECRET).ok(),
        }
    }

    /// Whether the persistence store should be initialized at all.
    pub fn persistence_enabled(&self) -> bool {
        self.database_url.is_some()
    }
}

fn default_state_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("colisten")
}

/// Resolves dashboard Basic-auth credentials, generating and logging a random
/// password once when `DASHBOARD_PASS` is absent rather than refusing to start.
fn dashboard_credentials() -> (String, String) {
    let user =
        std::env::var(env_vars::DASHBOARD_USER).unwrap_or_else(|_| "admin".to_string());

    match std::env::var(env_vars::DASHBOARD_PASS) {
        Ok(pass) => (user, pass),
        Err(_) => {
            let generated = generate_password();
            warn!(
                "{} not set; generated a dashboard password for this run: {}",
                env_vars::DASHBOARD_PASS,
                generated
            );
            (user, generated)
        }
    }
}

fn generate_password() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";
    let mut rng = rand::rng();
    (0..20)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Initializes the global configuration from the process environment. Safe to
/// call more than once; only the first call takes effect.
pub fn init_config() -> &'static Config {
    CONFIG.get_or_init(|| {
        let config = Config::from_env();
        info!(port = config.port, "configuration loaded");
        config
    })
}

/// Returns the global configuration, initializing it from the environment on
/// first access.
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_without_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        for k in [
            env_vars::PORT,
            env_vars::DATABASE_URL,
            env_vars::FRONTEND_URL,
        ] {
            unsafe { std::env::remove_var(k) };
        }
        let config = Config::from_env();
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(!config.persistence_enabled());
    }

    #[test]
    fn database_url_enables_persistence() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe { std::env::set_var(env_vars::DATABASE_URL, "/tmp/colisten-test.db") };
        let config = Config::from_env();
        assert!(config.persistence_enabled());
        unsafe { std::env::remove_var(env_vars::DATABASE_URL) };
    }
}
