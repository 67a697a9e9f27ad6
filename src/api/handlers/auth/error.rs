//! Failure taxonomy for the auth operations.
//!
//! Every data-layer or I/O fault inside an operation is mapped to one of
//! these kinds before it reaches the HTTP boundary; handlers render them as
//! the uniform response envelope, never as a raised fault. Code
//! verification failures collapse to a single kind so callers cannot tell
//! wrong-code from expired from already-used.

use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;
use tracing::error;

use super::types::AuthEnvelope;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Account not found")]
    NotFound,
    #[error("An account with this email already exists")]
    AlreadyExists,
    #[error("Invalid or expired code")]
    InvalidOrExpired,
    #[error("No password is set for this account")]
    PasswordNotSet,
    #[error("Invalid credentials")]
    InvalidCredential,
    #[error("Could not send the code email")]
    DeliveryFailed,
    #[error("Something went wrong")]
    Internal(anyhow::Error),
}

impl AuthError {
    /// Stable machine-readable kind for the envelope `error` field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::InvalidOrExpired => "invalid_or_expired",
            Self::PasswordNotSet => "password_not_set",
            Self::InvalidCredential => "invalid_credential",
            Self::DeliveryFailed => "delivery_failed",
            Self::Internal(_) => "internal",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyExists => StatusCode::CONFLICT,
            Self::InvalidOrExpired | Self::PasswordNotSet => StatusCode::BAD_REQUEST,
            Self::InvalidCredential => StatusCode::UNAUTHORIZED,
            Self::DeliveryFailed => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        // The cause chain stays in the logs; callers only ever see the
        // short kind + message pair.
        if let Self::Internal(ref err) = self {
            error!("auth operation failed: {err:?}");
        }
        let envelope = AuthEnvelope {
            success: false,
            message: Some(self.to_string()),
            error: Some(self.kind().to_string()),
            user: None,
        };
        (self.status(), Json(envelope)).into_response()
    }
}
