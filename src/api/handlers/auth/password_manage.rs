//! Authenticated password management.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;

use super::error::AuthError;
use super::password::{hash_password, verify_password};
use super::principal::require_auth;
use super::state::AuthState;
use super::storage::{lookup_user_by_id, set_password_hash};
use super::types::{AuthEnvelope, ChangePasswordRequest, SetPasswordRequest};
use super::{invalid_request, unauthorized, MIN_PASSWORD_CHARS};

#[utoipa::path(
    post,
    path = "/v1/auth/set-password",
    request_body = SetPasswordRequest,
    responses(
        (status = 200, description = "Password set", body = AuthEnvelope),
        (status = 401, description = "Missing or invalid session", body = AuthEnvelope)
    ),
    tag = "auth"
)]
pub async fn set_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SetPasswordRequest>>,
) -> impl IntoResponse {
    let Ok(principal) = require_auth(&headers, &auth_state) else {
        return unauthorized();
    };

    let Some(Json(request)) = payload else {
        return invalid_request("Missing payload");
    };
    if request.password.chars().count() < MIN_PASSWORD_CHARS {
        return invalid_request("Password is too short");
    }

    let hash = match hash_password(&request.password) {
        Ok(hash) => hash,
        Err(err) => return AuthError::Internal(err).into_response(),
    };

    match set_password_hash(&pool, principal.user_id, &hash).await {
        Ok(true) => (StatusCode::OK, Json(AuthEnvelope::ok("Password set"))).into_response(),
        Ok(false) => AuthError::NotFound.into_response(),
        Err(err) => AuthError::Internal(err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = AuthEnvelope),
        (status = 401, description = "Current password incorrect or session missing", body = AuthEnvelope)
    ),
    tag = "auth"
)]
pub async fn change_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ChangePasswordRequest>>,
) -> impl IntoResponse {
    let Ok(principal) = require_auth(&headers, &auth_state) else {
        return unauthorized();
    };

    let Some(Json(request)) = payload else {
        return invalid_request("Missing payload");
    };
    if request.new_password.chars().count() < MIN_PASSWORD_CHARS {
        return invalid_request("Password is too short");
    }

    // Session claims can be stale; the current hash comes from the store.
    let user = match lookup_user_by_id(&pool, principal.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return AuthError::NotFound.into_response(),
        Err(err) => return AuthError::Internal(err).into_response(),
    };

    let Some(stored_hash) = user.password_hash.as_deref() else {
        return AuthError::PasswordNotSet.into_response();
    };

    // Proof of the current password is required even for an authenticated
    // caller; a hijacked session must not be enough to rotate it. On
    // failure the stored hash is untouched.
    if !verify_password(&request.current_password, stored_hash) {
        return AuthError::InvalidCredential.into_response();
    }

    let hash = match hash_password(&request.new_password) {
        Ok(hash) => hash,
        Err(err) => return AuthError::Internal(err).into_response(),
    };

    match set_password_hash(&pool, user.id, &hash).await {
        Ok(true) => (StatusCode::OK, Json(AuthEnvelope::ok("Password changed"))).into_response(),
        Ok(false) => AuthError::NotFound.into_response(),
        Err(err) => AuthError::Internal(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{lazy_pool, signed_in_headers, test_auth_state};
    use super::*;
    use anyhow::Result;

    #[tokio::test]
    async fn set_password_requires_session() -> Result<()> {
        let response = set_password(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(test_auth_state()?),
            Some(Json(SetPasswordRequest {
                password: "a-long-enough-password".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn change_password_rejects_short_replacement() -> Result<()> {
        let state = test_auth_state()?;
        let headers = signed_in_headers(&state)?;
        let response = change_password(
            headers,
            Extension(lazy_pool()?),
            Extension(state),
            Some(Json(ChangePasswordRequest {
                current_password: "old-password".to_string(),
                new_password: "short".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
