//! One-time code issuance for login, signup, and password reset.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};

use crate::api::email::{CodeEmail, CodeKind};

use super::error::AuthError;
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::state::AuthState;
use super::storage::{insert_code, lookup_user_by_email, sweep_expired_codes, CodePurpose};
use super::types::{AuthEnvelope, IssueCodeRequest};
use super::utils::{extract_client_ip, generate_code, normalize_email, valid_email};
use super::{invalid_request, rate_limited};

const fn kind_for(purpose: CodePurpose) -> CodeKind {
    match purpose {
        CodePurpose::Login => CodeKind::Login,
        CodePurpose::Signup => CodeKind::Signup,
        CodePurpose::PasswordReset => CodeKind::Reset,
    }
}

/// Issue a code for `purpose` and dispatch it by email.
///
/// Login and reset codes require an existing account; signup codes require
/// the address to be free. A delivery failure is reported to the caller
/// even though the ledger row already exists; the dangling pending row is
/// harmless and gets swept at expiry.
async fn issue(
    pool: &PgPool,
    auth_state: &AuthState,
    email: &str,
    purpose: CodePurpose,
) -> Result<(), AuthError> {
    // Hygiene only; a failed sweep must never block issuance.
    if let Err(err) = sweep_expired_codes(pool).await {
        warn!("pre-issuance sweep failed: {err}");
    }

    let user_id = match purpose {
        CodePurpose::Login | CodePurpose::PasswordReset => {
            match lookup_user_by_email(pool, email).await? {
                Some(user) => Some(user.id),
                None => return Err(AuthError::NotFound),
            }
        }
        CodePurpose::Signup => {
            if lookup_user_by_email(pool, email).await?.is_some() {
                return Err(AuthError::AlreadyExists);
            }
            None
        }
    };

    let code = generate_code()?;
    insert_code(
        pool,
        email,
        user_id,
        &code,
        purpose,
        auth_state.config().code_ttl_seconds(),
    )
    .await?;

    let message = CodeEmail {
        to_email: email.to_string(),
        code,
        kind: kind_for(purpose),
    };
    if let Err(err) = auth_state.mailer().send(&message).await {
        error!("code delivery failed: {err}");
        return Err(AuthError::DeliveryFailed);
    }

    Ok(())
}

async fn issue_code_response(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
    payload: Option<Json<IssueCodeRequest>>,
    purpose: CodePurpose,
) -> axum::response::Response {
    let Some(Json(request)) = payload else {
        return invalid_request("Missing payload");
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return invalid_request("Invalid email");
    }

    let client_ip = extract_client_ip(headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::IssueCode)
        == RateLimitDecision::Limited
        || auth_state
            .rate_limiter()
            .check_email(&email, RateLimitAction::IssueCode)
            == RateLimitDecision::Limited
    {
        return rate_limited();
    }

    match issue(pool, auth_state, &email, purpose).await {
        Ok(()) => (StatusCode::OK, Json(AuthEnvelope::ok("Code sent"))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/login-code",
    request_body = IssueCodeRequest,
    responses(
        (status = 200, description = "Login code sent", body = AuthEnvelope),
        (status = 404, description = "No account for this email", body = AuthEnvelope),
        (status = 502, description = "Code email could not be delivered", body = AuthEnvelope)
    ),
    tag = "auth"
)]
pub async fn issue_login_code(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<IssueCodeRequest>>,
) -> impl IntoResponse {
    issue_code_response(&headers, &pool, &auth_state, payload, CodePurpose::Login).await
}

#[utoipa::path(
    post,
    path = "/v1/auth/signup-code",
    request_body = IssueCodeRequest,
    responses(
        (status = 200, description = "Signup code sent", body = AuthEnvelope),
        (status = 409, description = "Email already has an account", body = AuthEnvelope),
        (status = 502, description = "Code email could not be delivered", body = AuthEnvelope)
    ),
    tag = "auth"
)]
pub async fn issue_signup_code(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<IssueCodeRequest>>,
) -> impl IntoResponse {
    issue_code_response(&headers, &pool, &auth_state, payload, CodePurpose::Signup).await
}

#[utoipa::path(
    post,
    path = "/v1/auth/reset-code",
    request_body = IssueCodeRequest,
    responses(
        (status = 200, description = "Password reset code sent", body = AuthEnvelope),
        (status = 404, description = "No account for this email", body = AuthEnvelope),
        (status = 502, description = "Code email could not be delivered", body = AuthEnvelope)
    ),
    tag = "auth"
)]
pub async fn issue_reset_code(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<IssueCodeRequest>>,
) -> impl IntoResponse {
    issue_code_response(
        &headers,
        &pool,
        &auth_state,
        payload,
        CodePurpose::PasswordReset,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::super::tests::{lazy_pool, test_auth_state};
    use super::*;
    use anyhow::Result;

    #[test]
    fn kind_follows_purpose() {
        assert_eq!(kind_for(CodePurpose::Login), CodeKind::Login);
        assert_eq!(kind_for(CodePurpose::Signup), CodeKind::Signup);
        assert_eq!(kind_for(CodePurpose::PasswordReset), CodeKind::Reset);
    }

    #[tokio::test]
    async fn issue_login_code_missing_payload() -> Result<()> {
        let response = issue_login_code(
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
    async fn issue_signup_code_rejects_bad_email() -> Result<()> {
        let response = issue_signup_code(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(test_auth_state()?),
            Some(Json(IssueCodeRequest {
                email: "not-an-email".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
