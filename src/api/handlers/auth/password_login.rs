//! Password login and signup.
//!
//! Both paths end in the same session issuance as the OTC flows; the only
//! difference a relying party can observe is the `method` claim.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum::Json;
use sqlx::PgPool;
use std::sync::Arc;

use super::error::AuthError;
use super::password::{hash_password, verify_password};
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::session::signed_in_response;
use super::state::AuthState;
use super::storage::{insert_user, lookup_user_by_email, NewUser, SignupOutcome};
use super::types::{AuthEnvelope, AuthMethod, PasswordLoginRequest, PasswordSignupRequest};
use super::utils::{extract_client_ip, normalize_email, valid_email};
use super::{invalid_request, rate_limited, MIN_PASSWORD_CHARS};

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = PasswordLoginRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = AuthEnvelope),
        (status = 401, description = "Invalid credentials", body = AuthEnvelope),
        (status = 404, description = "No account for this email", body = AuthEnvelope)
    ),
    tag = "auth"
)]
pub async fn login_with_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<PasswordLoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return invalid_request("Missing payload");
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return invalid_request("Invalid email");
    }

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::PasswordLogin)
        == RateLimitDecision::Limited
        || auth_state
            .rate_limiter()
            .check_email(&email, RateLimitAction::PasswordLogin)
            == RateLimitDecision::Limited
    {
        return rate_limited();
    }

    let user = match lookup_user_by_email(&pool, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => return AuthError::NotFound.into_response(),
        Err(err) => return AuthError::Internal(err).into_response(),
    };

    // OTC-only accounts have no hash; that is a distinct outcome so the UI
    // can steer the caller to the code flow instead.
    let Some(stored_hash) = user.password_hash.as_deref() else {
        return AuthError::PasswordNotSet.into_response();
    };

    if !verify_password(&request.password, stored_hash) {
        return AuthError::InvalidCredential.into_response();
    }

    signed_in_response(
        &auth_state,
        &user,
        AuthMethod::Password,
        StatusCode::OK,
        "Signed in",
    )
}

#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    request_body = PasswordSignupRequest,
    responses(
        (status = 201, description = "Account created; session cookie set", body = AuthEnvelope),
        (status = 409, description = "Email already has an account", body = AuthEnvelope)
    ),
    tag = "auth"
)]
pub async fn signup_with_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<PasswordSignupRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return invalid_request("Missing payload");
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return invalid_request("Invalid email");
    }
    if request.password.chars().count() < MIN_PASSWORD_CHARS {
        return invalid_request("Password is too short");
    }

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::PasswordLogin)
        == RateLimitDecision::Limited
        || auth_state
            .rate_limiter()
            .check_email(&email, RateLimitAction::PasswordLogin)
            == RateLimitDecision::Limited
    {
        return rate_limited();
    }

    let hash = match hash_password(&request.password) {
        Ok(hash) => hash,
        Err(err) => return AuthError::Internal(err).into_response(),
    };

    // Password signup skips the emailed-code proof, so the account is
    // considered verified immediately.
    let outcome = insert_user(
        &pool,
        NewUser {
            email: &email,
            first_name: request.first_name.trim(),
            last_name: request.last_name.trim(),
            password_hash: Some(&hash),
            is_verified: true,
        },
    )
    .await;

    match outcome {
        Ok(SignupOutcome::Created(user)) => signed_in_response(
            &auth_state,
            &user,
            AuthMethod::Password,
            StatusCode::CREATED,
            "Account created",
        ),
        Ok(SignupOutcome::Conflict) => AuthError::AlreadyExists.into_response(),
        Err(err) => AuthError::Internal(err).into_response(),
    }
}
