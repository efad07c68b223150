//! Single shared admin credential, checked with HTTP Basic auth.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use subtle::ConstantTimeEq;

use crate::api::response::ApiError;
use crate::config::AuthConfig;
use crate::AppState;

#[derive(Clone)]
pub struct AdminCredentials {
    username: String,
    password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Constant-time comparison of two strings.
fn secure_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

impl AdminCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.admin_username, &config.admin_password)
    }

    /// Both halves are always compared so timing does not reveal which one failed.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let user_ok = secure_compare(username, &self.username);
        let pass_ok = secure_compare(password, &self.password);
        user_ok & pass_ok
    }

    /// Verify an `Authorization: Basic <base64(user:pass)>` header value.
    pub fn verify_header(&self, header: &str) -> bool {
        match parse_basic(header) {
            Some((username, password)) => self.verify(&username, &password),
            None => false,
        }
    }
}

fn parse_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Extractor that admits only requests carrying the admin credential.
///
/// Put it before any body extractor so unauthenticated uploads are refused
/// without reading the body.
pub struct RequireAdmin;

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        let authorized = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .is_some_and(|h| state.admin.verify_header(h));

        if authorized {
            Ok(RequireAdmin)
        } else {
            tracing::warn!(
                method = %parts.method,
                path = %parts.uri.path(),
                "Rejected request without valid admin credentials"
            );
            Err(ApiError::unauthorized("Unauthorized"))
        }
    }
}
