//! Auth handlers and supporting modules.
//!
//! This module owns the dual-mode authentication core: one-time emailed
//! codes and passwords, both converging on the same stateless session
//! token.
//!
//! ## Session model
//!
//! Sessions are self-contained signed tokens resolved without a database
//! round trip. All instances that issue or resolve sessions must share the
//! signing secret.
//!
//! > **Warning:** Rotating the secret invalidates every outstanding
//! > session.
//!
//! ## Code ledger
//!
//! One-time codes live in `one_time_codes` with a 10-minute expiry and are
//! consumed through a single atomic conditional update; the sweeper only
//! handles storage hygiene.

pub(crate) mod codes;
mod error;
mod password;
pub(crate) mod password_login;
pub(crate) mod password_manage;
pub(crate) mod principal;
mod rate_limit;
pub(crate) mod session;
mod state;
pub(crate) mod storage;
pub(crate) mod sweep;
pub(crate) mod types;
mod utils;
pub(crate) mod verify;

pub use error::AuthError;
pub use rate_limit::{NoopRateLimiter, RateLimitAction, RateLimitDecision, RateLimiter};
pub use session::{SessionClaims, SessionSigner};
pub use state::{AuthConfig, AuthState};
pub use storage::sweep_expired_codes;
pub use types::{AuthEnvelope, AuthMethod, PublicUser, Role};

use axum::{http::StatusCode, response::IntoResponse, Json};

/// Shortest password accepted by the set/change/signup/reset flows.
pub(crate) const MIN_PASSWORD_CHARS: usize = 8;

/// Malformed-request answer, still shaped as the uniform envelope.
pub(super) fn invalid_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(AuthEnvelope {
            success: false,
            message: Some(message.to_string()),
            error: Some("invalid_request".to_string()),
            user: None,
        }),
    )
        .into_response()
}

pub(super) fn rate_limited() -> axum::response::Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(AuthEnvelope {
            success: false,
            message: Some("Too many attempts, try again later".to_string()),
            error: Some("rate_limited".to_string()),
            user: None,
        }),
    )
        .into_response()
}

pub(super) fn unauthorized() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(AuthEnvelope {
            success: false,
            message: Some("Sign in required".to_string()),
            error: Some("unauthorized".to_string()),
            user: None,
        }),
    )
        .into_response()
}

pub(super) fn forbidden() -> axum::response::Response {
    (
        StatusCode::FORBIDDEN,
        Json(AuthEnvelope {
            success: false,
            message: Some("Not allowed".to_string()),
            error: Some("forbidden".to_string()),
            user: None,
        }),
    )
        .into_response()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::rate_limit::NoopRateLimiter;
    use super::session::{session_cookie, SessionSigner};
    use super::state::{AuthConfig, AuthState};
    use super::storage::UserRecord;
    use super::types::{AuthMethod, Role};
    use crate::api::email::LogEmailSender;
    use anyhow::Result;
    use axum::http::{header::COOKIE, HeaderMap};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use sqlx::PgPool;
    use std::sync::Arc;
    use uuid::Uuid;

    /// A pool that never connects; enough for handlers that bail on
    /// validation before touching the database.
    pub(crate) fn lazy_pool() -> Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
    }

    pub(crate) fn test_auth_state() -> Result<Arc<AuthState>> {
        let config = AuthConfig::new("https://scoutline.app".to_string());
        let signer = SessionSigner::new(
            &SecretString::from("unit-test-secret"),
            config.session_ttl_seconds(),
        )?;
        Ok(Arc::new(AuthState::new(
            config,
            signer,
            Arc::new(LogEmailSender),
            Arc::new(NoopRateLimiter),
        )))
    }

    /// Headers carrying a valid session cookie for a non-admin player.
    pub(crate) fn signed_in_headers(state: &AuthState) -> Result<HeaderMap> {
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: "player@scoutline.app".to_string(),
            first_name: "Pat".to_string(),
            last_name: "Player".to_string(),
            password_hash: None,
            role: Role::Player,
            is_verified: true,
        };
        let token = state.signer().issue(&user, AuthMethod::Otc)?;
        let cookie = session_cookie(state.config(), &token)?;
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie);
        Ok(headers)
    }
}
