//! Request/response types for the auth endpoints.
//!
//! Every operation answers with [`AuthEnvelope`]; failures are data, not
//! faults, so the UI layer never has to catch anything.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Flat role label carried in the session claims.
///
/// `user` is the least-privileged default; anything finer-grained than this
/// single label is out of scope for the identity core.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    User,
    Player,
    Agent,
    Editor,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Player => "player",
            Self::Agent => "agent",
            Self::Editor => "editor",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            "player" => Some(Self::Player),
            "agent" => Some(Self::Agent),
            "editor" => Some(Self::Editor),
            _ => None,
        }
    }
}

/// How the caller proved their identity; carried in the session claims.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Otc,
    Password,
}

/// User fields safe to hand back to the UI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_verified: bool,
}

/// Uniform response envelope for every auth operation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUser>,
}

impl AuthEnvelope {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            user: None,
        }
    }

    #[must_use]
    pub fn ok_user(message: impl Into<String>, user: PublicUser) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            user: Some(user),
        }
    }

    #[must_use]
    pub fn no_identity() -> Self {
        Self {
            success: false,
            message: Some("No active session".to_string()),
            error: None,
            user: None,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct IssueCodeRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyLoginCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifySignupCodeRequest {
    pub email: String,
    pub code: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PasswordLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PasswordSignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SetPasswordRequest {
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn role_round_trips_through_strings() {
        for role in [Role::Admin, Role::User, Role::Player, Role::Agent, Role::Editor] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn role_serde_uses_snake_case() -> Result<()> {
        let value = serde_json::to_value(Role::Player)?;
        assert_eq!(value, serde_json::json!("player"));
        let decoded: Role = serde_json::from_value(serde_json::json!("agent"))?;
        assert_eq!(decoded, Role::Agent);
        Ok(())
    }

    #[test]
    fn envelope_omits_empty_fields() -> Result<()> {
        let value = serde_json::to_value(AuthEnvelope::ok("Code sent"))?;
        let object = value.as_object().context("expected object")?;
        assert_eq!(object.get("success"), Some(&serde_json::json!(true)));
        assert!(object.contains_key("message"));
        assert!(!object.contains_key("error"));
        assert!(!object.contains_key("user"));
        Ok(())
    }

    #[test]
    fn envelope_carries_user() -> Result<()> {
        let user = PublicUser {
            id: "5f1cbe43-0a0e-4f21-b527-f1a4b7e0c001".to_string(),
            email: "keeper@scoutline.app".to_string(),
            first_name: "Sam".to_string(),
            last_name: "Keeper".to_string(),
            role: Role::Player,
            is_verified: true,
        };
        let value = serde_json::to_value(AuthEnvelope::ok_user("Signed in", user))?;
        let email = value
            .pointer("/user/email")
            .and_then(serde_json::Value::as_str)
            .context("missing user email")?;
        assert_eq!(email, "keeper@scoutline.app");
        Ok(())
    }

    #[test]
    fn verify_signup_request_round_trips() -> Result<()> {
        let request = VerifySignupCodeRequest {
            email: "new@scoutline.app".to_string(),
            code: "123456".to_string(),
            first_name: "Alex".to_string(),
            last_name: "Winger".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let decoded: VerifySignupCodeRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.code, "123456");
        assert_eq!(decoded.first_name, "Alex");
        Ok(())
    }
}
