//! Authenticated principal extraction.
//!
//! Identity comes entirely from the session token: signature and expiry are
//! checked, the credential store is not. Claims can therefore trail the
//! store until the token is reissued; handlers that must see current state
//! (like change-password) reload the user row by id.

use axum::http::{HeaderMap, StatusCode};

use super::session::extract_session_token;
use super::state::AuthState;
use super::types::{AuthMethod, Role};

/// Caller context derived from a resolved session token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: uuid::Uuid,
    pub email: String,
    pub role: Role,
    pub verified: bool,
    pub method: AuthMethod,
}

/// Resolve the session token into a principal, or 401 when there is none.
pub fn require_auth(headers: &HeaderMap, auth_state: &AuthState) -> Result<Principal, StatusCode> {
    let token = extract_session_token(headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let claims = auth_state
        .signer()
        .resolve(&token)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    Ok(Principal {
        user_id: claims.sub,
        email: claims.email,
        role: claims.role,
        verified: claims.verified,
        method: claims.method,
    })
}
