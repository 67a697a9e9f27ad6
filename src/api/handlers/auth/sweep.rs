//! Operator-facing sweep of the one-time-code ledger.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;

use super::error::AuthError;
use super::principal::require_auth;
use super::state::AuthState;
use super::storage::sweep_expired_codes;
use super::types::{AuthEnvelope, Role};
use super::{forbidden, unauthorized};

#[utoipa::path(
    post,
    path = "/v1/auth/sweep",
    responses(
        (status = 200, description = "Expired codes removed", body = AuthEnvelope),
        (status = 401, description = "Missing or invalid session", body = AuthEnvelope),
        (status = 403, description = "Caller is not an admin", body = AuthEnvelope)
    ),
    tag = "auth"
)]
pub async fn sweep_codes(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let Ok(principal) = require_auth(&headers, &auth_state) else {
        return unauthorized();
    };
    // Flat role check only; there is no finer-grained policy layer.
    if principal.role != Role::Admin {
        return forbidden();
    }

    match sweep_expired_codes(&pool).await {
        Ok(deleted) => (
            StatusCode::OK,
            Json(AuthEnvelope::ok(format!("Removed {deleted} expired codes"))),
        )
            .into_response(),
        Err(err) => AuthError::Internal(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{lazy_pool, signed_in_headers, test_auth_state};
    use super::*;
    use anyhow::Result;

    #[tokio::test]
    async fn sweep_requires_session() -> Result<()> {
        let response = sweep_codes(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(test_auth_state()?),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn sweep_rejects_non_admin() -> Result<()> {
        let state = test_auth_state()?;
        // The shared helper signs in a non-admin player.
        let headers = signed_in_headers(&state)?;
        let response = sweep_codes(headers, Extension(lazy_pool()?), Extension(state))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        Ok(())
    }
}
