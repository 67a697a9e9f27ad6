//! Stateless session tokens and the endpoints that read or clear them.
//!
//! A session is a signed HS256 token carrying the full identity claim set;
//! validation is signature + expiry only, with no store lookup. Tokens are
//! transported in an `HttpOnly` cookie (with a bearer-header fallback for
//! non-browser callers) and simply discarded on logout. There is no
//! server-side revocation list: a session stays valid until expiry and
//! claim changes only take effect when a token is reissued. That trade-off
//! is deliberate and should not be "fixed" here without a denylist design.

use anyhow::{bail, Context, Result};
use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, AUTHORIZATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::state::{AuthConfig, AuthState};
use super::storage::UserRecord;
use super::types::{AuthEnvelope, AuthMethod, PublicUser, Role};

pub(crate) const SESSION_COOKIE_NAME: &str = "session";

/// Claim set embedded in every session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub verified: bool,
    pub method: AuthMethod,
    pub iat: i64,
    pub exp: i64,
}

impl From<&SessionClaims> for PublicUser {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            id: claims.sub.to_string(),
            email: claims.email.clone(),
            first_name: claims.first_name.clone(),
            last_name: claims.last_name.clone(),
            role: claims.role,
            is_verified: claims.verified,
        }
    }
}

impl From<&UserRecord> for PublicUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            is_verified: user.is_verified,
        }
    }
}

/// Signs and resolves session tokens with a process-wide secret.
///
/// The secret must be identical across all instances; a token minted on one
/// instance has to resolve on any other.
pub struct SessionSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
}

impl SessionSigner {
    /// # Errors
    ///
    /// Returns an error when the secret is empty; running without one would
    /// make every session forgeable, so startup must abort instead.
    pub fn new(secret: &SecretString, ttl_seconds: i64) -> Result<Self> {
        let secret = secret.expose_secret();
        if secret.trim().is_empty() {
            bail!("session signing secret is empty; refusing to start");
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        })
    }

    /// Mint a session token for the given user.
    ///
    /// # Errors
    ///
    /// Returns an error if JWT encoding fails.
    pub fn issue(&self, user: &UserRecord, method: AuthMethod) -> Result<String> {
        let now = now_unix();
        let claims = SessionClaims {
            sub: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            verified: user.is_verified,
            method,
            iat: now,
            exp: now + self.ttl_seconds,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .context("failed to sign session token")
    }

    /// Resolve a token into its claims.
    ///
    /// Malformed tokens, bad signatures, expired tokens, and missing claims
    /// all collapse to `None`; resolution never errors to the caller.
    #[must_use]
    pub fn resolve(&self, token: &str) -> Option<SessionClaims> {
        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &Validation::default())
            .ok()
            .map(|data| data.claims)
    }
}

fn now_unix() -> i64 {
    #[allow(clippy::cast_possible_wrap)]
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    secs
}

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Envelope with the current identity, or no identity", body = AuthEnvelope)
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    // Missing cookies are simply "no identity"; never an error.
    let Some(token) = extract_session_token(&headers) else {
        return (StatusCode::OK, Json(AuthEnvelope::no_identity())).into_response();
    };

    match auth_state.signer().resolve(&token) {
        Some(claims) => {
            let user = PublicUser::from(&claims);
            (
                StatusCode::OK,
                Json(AuthEnvelope::ok_user("Session is active", user)),
            )
                .into_response()
        }
        None => {
            // A cookie that does not resolve is dead weight; tell the
            // client to drop it along with the no-identity answer.
            let mut response_headers = HeaderMap::new();
            if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
                response_headers.insert(SET_COOKIE, cookie);
            }
            (
                StatusCode::OK,
                response_headers,
                Json(AuthEnvelope::no_identity()),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = AuthEnvelope)
    ),
    tag = "auth"
)]
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    // Sessions are stateless, so logout is purely a client-side cookie
    // deletion; there is nothing to revoke server-side.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (
        StatusCode::OK,
        response_headers,
        Json(AuthEnvelope::ok("Signed out")),
    )
        .into_response()
}

/// Build a secure `HttpOnly` cookie for the session token.
pub(super) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let secure = config.session_cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = config.session_cookie_secure();
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Issue a session for `user`, set the cookie, and answer with the envelope.
///
/// Shared by every flow that ends in a signed-in user so the OTC and
/// password paths cannot drift apart.
pub(super) fn signed_in_response(
    auth_state: &AuthState,
    user: &UserRecord,
    method: AuthMethod,
    status: StatusCode,
    message: &str,
) -> axum::response::Response {
    let token = match auth_state.signer().issue(user, method) {
        Ok(token) => token,
        Err(err) => return super::error::AuthError::Internal(err).into_response(),
    };

    let mut response_headers = HeaderMap::new();
    match session_cookie(auth_state.config(), &token) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            return super::error::AuthError::Internal(anyhow::anyhow!(
                "failed to build session cookie: {err}"
            ))
            .into_response()
        }
    }

    (
        status,
        response_headers,
        Json(AuthEnvelope::ok_user(message, PublicUser::from(user))),
    )
        .into_response()
}
