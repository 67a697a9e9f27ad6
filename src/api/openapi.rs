//! OpenAPI document for the service.
//!
//! Add new endpoints to `paths(...)` so they stay documented; the Swagger
//! UI and the JSON document are both derived from this single spec.

use utoipa::OpenApi;

use super::handlers::auth::types::{
    AuthEnvelope, AuthMethod, ChangePasswordRequest, IssueCodeRequest, PasswordLoginRequest,
    PasswordSignupRequest, PublicUser, ResetPasswordRequest, Role, SetPasswordRequest,
    VerifyLoginCodeRequest, VerifySignupCodeRequest,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::health::health,
        super::handlers::auth::codes::issue_login_code,
        super::handlers::auth::codes::issue_signup_code,
        super::handlers::auth::codes::issue_reset_code,
        super::handlers::auth::verify::verify_login_code,
        super::handlers::auth::verify::verify_signup_code,
        super::handlers::auth::verify::reset_password_with_code,
        super::handlers::auth::password_login::login_with_password,
        super::handlers::auth::password_login::signup_with_password,
        super::handlers::auth::password_manage::set_password,
        super::handlers::auth::password_manage::change_password,
        super::handlers::auth::session::session,
        super::handlers::auth::session::logout,
        super::handlers::auth::sweep::sweep_codes,
    ),
    components(schemas(
        AuthEnvelope,
        PublicUser,
        Role,
        AuthMethod,
        IssueCodeRequest,
        VerifyLoginCodeRequest,
        VerifySignupCodeRequest,
        PasswordLoginRequest,
        PasswordSignupRequest,
        ResetPasswordRequest,
        SetPasswordRequest,
        ChangePasswordRequest,
    )),
    tags(
        (name = "scoutline", description = "Service health and metadata"),
        (name = "auth", description = "One-time codes, passwords, and sessions")
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_auth_operation() {
        let spec = openapi();
        let paths = &spec.paths.paths;
        for path in [
            "/health",
            "/v1/auth/login-code",
            "/v1/auth/signup-code",
            "/v1/auth/reset-code",
            "/v1/auth/login-code/verify",
            "/v1/auth/signup-code/verify",
            "/v1/auth/reset-password",
            "/v1/auth/login",
            "/v1/auth/signup",
            "/v1/auth/set-password",
            "/v1/auth/change-password",
            "/v1/auth/session",
            "/v1/auth/logout",
            "/v1/auth/sweep",
        ] {
            assert!(paths.contains_key(path), "missing path: {path}");
        }
    }
}
