//! One-time code verification for login, signup, and password reset.
//!
//! Every failure here answers with the same undifferentiated
//! `invalid_or_expired` outcome: wrong code, wrong purpose, already
//! consumed, and past expiry are indistinguishable to the caller. The
//! single lookup predicate lives in `storage::consume_code`; nothing in
//! this module branches on which dimension mismatched.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;

use super::error::AuthError;
use super::password::hash_password;
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::session::signed_in_response;
use super::state::AuthState;
use super::storage::{
    consume_code, insert_user, lookup_user_by_id, mark_verified, set_password_hash, CodePurpose,
    NewUser, SignupOutcome, UserRecord,
};
use super::types::{
    AuthEnvelope, AuthMethod, ResetPasswordRequest, VerifyLoginCodeRequest,
    VerifySignupCodeRequest,
};
use super::utils::{extract_client_ip, normalize_email, valid_email};
use super::{invalid_request, rate_limited, MIN_PASSWORD_CHARS};

fn check_verify_limits(
    headers: &HeaderMap,
    auth_state: &AuthState,
    email: &str,
) -> RateLimitDecision {
    let client_ip = extract_client_ip(headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::VerifyCode)
        == RateLimitDecision::Limited
        || auth_state
            .rate_limiter()
            .check_email(email, RateLimitAction::VerifyCode)
            == RateLimitDecision::Limited
    {
        RateLimitDecision::Limited
    } else {
        RateLimitDecision::Allowed
    }
}

/// Consume a code that must be linked to an existing user and load that
/// user. A row without a linked user id cannot come out of a well-formed
/// flow, so it collapses into the same undifferentiated failure.
async fn consume_for_user(
    pool: &PgPool,
    email: &str,
    code: &str,
    purpose: CodePurpose,
) -> Result<UserRecord, AuthError> {
    let consumed = consume_code(pool, email, code, purpose)
        .await?
        .ok_or(AuthError::InvalidOrExpired)?;

    let user_id = consumed.user_id.ok_or(AuthError::InvalidOrExpired)?;
    lookup_user_by_id(pool, user_id)
        .await?
        .ok_or(AuthError::InvalidOrExpired)
}

#[utoipa::path(
    post,
    path = "/v1/auth/login-code/verify",
    request_body = VerifyLoginCodeRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = AuthEnvelope),
        (status = 400, description = "Invalid or expired code", body = AuthEnvelope)
    ),
    tag = "auth"
)]
pub async fn verify_login_code(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyLoginCodeRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return invalid_request("Missing payload");
    };

    let email = normalize_email(&request.email);
    let code = request.code.trim();
    if !valid_email(&email) || code.is_empty() {
        return invalid_request("Invalid email or code");
    }

    if check_verify_limits(&headers, &auth_state, &email) == RateLimitDecision::Limited {
        return rate_limited();
    }

    let mut user = match consume_for_user(&pool, &email, code, CodePurpose::Login).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    // A verified login code proves control of the address, so the first
    // successful one flips the account's verification flag.
    if !user.is_verified {
        if let Err(err) = mark_verified(&pool, user.id).await {
            return AuthError::Internal(err).into_response();
        }
        user.is_verified = true;
    }

    signed_in_response(&auth_state, &user, AuthMethod::Otc, StatusCode::OK, "Signed in")
}

#[utoipa::path(
    post,
    path = "/v1/auth/signup-code/verify",
    request_body = VerifySignupCodeRequest,
    responses(
        (status = 201, description = "Account created; session cookie set", body = AuthEnvelope),
        (status = 400, description = "Invalid or expired code", body = AuthEnvelope),
        (status = 409, description = "Email already has an account", body = AuthEnvelope)
    ),
    tag = "auth"
)]
pub async fn verify_signup_code(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifySignupCodeRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return invalid_request("Missing payload");
    };

    let email = normalize_email(&request.email);
    let code = request.code.trim();
    if !valid_email(&email) || code.is_empty() {
        return invalid_request("Invalid email or code");
    }

    if check_verify_limits(&headers, &auth_state, &email) == RateLimitDecision::Limited {
        return rate_limited();
    }

    match consume_code(&pool, &email, code, CodePurpose::Signup).await {
        Ok(Some(_)) => {}
        Ok(None) => return AuthError::InvalidOrExpired.into_response(),
        Err(err) => return AuthError::Internal(err).into_response(),
    }

    // The code proved control of the address, so the account starts out
    // verified. A concurrent signup for the same email loses on the unique
    // index, not on a pre-check.
    let outcome = insert_user(
        &pool,
        NewUser {
            email: &email,
            first_name: request.first_name.trim(),
            last_name: request.last_name.trim(),
            password_hash: None,
            is_verified: true,
        },
    )
    .await;

    match outcome {
        Ok(SignupOutcome::Created(user)) => signed_in_response(
            &auth_state,
            &user,
            AuthMethod::Otc,
            StatusCode::CREATED,
            "Account created",
        ),
        Ok(SignupOutcome::Conflict) => AuthError::AlreadyExists.into_response(),
        Err(err) => AuthError::Internal(err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = AuthEnvelope),
        (status = 400, description = "Invalid or expired code", body = AuthEnvelope)
    ),
    tag = "auth"
)]
pub async fn reset_password_with_code(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return invalid_request("Missing payload");
    };

    let email = normalize_email(&request.email);
    let code = request.code.trim();
    if !valid_email(&email) || code.is_empty() {
        return invalid_request("Invalid email or code");
    }
    if request.new_password.chars().count() < MIN_PASSWORD_CHARS {
        return invalid_request("Password is too short");
    }

    if check_verify_limits(&headers, &auth_state, &email) == RateLimitDecision::Limited {
        return rate_limited();
    }

    let user = match consume_for_user(&pool, &email, code, CodePurpose::PasswordReset).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    let hash = match hash_password(&request.new_password) {
        Ok(hash) => hash,
        Err(err) => return AuthError::Internal(err).into_response(),
    };

    match set_password_hash(&pool, user.id, &hash).await {
        Ok(true) => (StatusCode::OK, Json(AuthEnvelope::ok("Password updated"))).into_response(),
        Ok(false) => AuthError::NotFound.into_response(),
        Err(err) => AuthError::Internal(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{lazy_pool, test_auth_state};
    use super::*;
    use anyhow::Result;

    #[tokio::test]
    async fn verify_login_code_missing_payload() -> Result<()> {
        let response = verify_login_code(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(test_auth_state()?),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_signup_code_rejects_empty_code() -> Result<()> {
        let response = verify_signup_code(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(test_auth_state()?),
            Some(Json(VerifySignupCodeRequest {
                email: "new@scoutline.app".to_string(),
                code: "  ".to_string(),
                first_name: "Alex".to_string(),
                last_name: "Winger".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn reset_password_rejects_short_password() -> Result<()> {
        let response = reset_password_with_code(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(test_auth_state()?),
            Some(Json(ResetPasswordRequest {
                email: "keeper@scoutline.app".to_string(),
                code: "123456".to_string(),
                new_password: "short".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
