use crate::api::handlers::{auth, health};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa_swagger_ui::SwaggerUi;

use self::email::EmailSender;

pub mod email;
pub mod handlers;
mod openapi;
pub mod sweeper;

pub use openapi::openapi;

/// Build the application router with every documented route and the shared
/// middleware stack.
///
/// # Errors
///
/// Returns an error when the configured base URL cannot be turned into a
/// CORS origin.
pub fn app(pool: PgPool, auth_state: Arc<auth::AuthState>) -> Result<Router> {
    let frontend_origin = frontend_origin(auth_state.config().base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let router = Router::new()
        .route("/health", get(health::health))
        .route("/v1/auth/login-code", post(auth::codes::issue_login_code))
        .route("/v1/auth/signup-code", post(auth::codes::issue_signup_code))
        .route("/v1/auth/reset-code", post(auth::codes::issue_reset_code))
        .route(
            "/v1/auth/login-code/verify",
            post(auth::verify::verify_login_code),
        )
        .route(
            "/v1/auth/signup-code/verify",
            post(auth::verify::verify_signup_code),
        )
        .route(
            "/v1/auth/reset-password",
            post(auth::verify::reset_password_with_code),
        )
        .route(
            "/v1/auth/login",
            post(auth::password_login::login_with_password),
        )
        .route(
            "/v1/auth/signup",
            post(auth::password_login::signup_with_password),
        )
        .route(
            "/v1/auth/set-password",
            post(auth::password_manage::set_password),
        )
        .route(
            "/v1/auth/change-password",
            post(auth::password_manage::change_password),
        )
        .route("/v1/auth/session", get(auth::session::session))
        .route("/v1/auth/logout", post(auth::session::logout))
        .route("/v1/auth/sweep", post(auth::sweep::sweep_codes))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(auth_state))
                .layer(Extension(pool)),
        );

    Ok(router)
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    config: auth::AuthConfig,
    signer: auth::SessionSigner,
    mailer: Arc<dyn EmailSender>,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let auth_state = Arc::new(auth::AuthState::new(
        config,
        signer,
        mailer,
        Arc::new(auth::NoopRateLimiter),
    ));

    // Scheduled ledger hygiene; correctness never depends on it having run.
    sweeper::spawn_code_sweeper(pool.clone(), sweeper::SweeperConfig::new());

    let app = app(pool, auth_state)?;

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(base_url).with_context(|| format!("Invalid base URL: {base_url}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("Base URL must include a valid host: {base_url}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}

#[cfg(test)]
mod tests {
    use super::handlers::auth::tests::{lazy_pool, test_auth_state};
    use super::*;
    use tower::ServiceExt;

    #[test]
    fn frontend_origin_drops_path_and_keeps_port() -> Result<()> {
        let origin = frontend_origin("https://scoutline.app/some/path")?;
        assert_eq!(origin.to_str()?, "https://scoutline.app");

        let origin = frontend_origin("http://localhost:3000/")?;
        assert_eq!(origin.to_str()?, "http://localhost:3000");
        Ok(())
    }

    #[test]
    fn frontend_origin_rejects_garbage() {
        assert!(frontend_origin("not a url").is_err());
    }

    #[tokio::test]
    async fn health_route_answers_without_database() -> Result<()> {
        let router = app(lazy_pool()?, test_auth_state()?)?;
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .map_err(anyhow::Error::from)?,
            )
            .await
            .map_err(|err| anyhow!("router error: {err:?}"))?;
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn session_route_reports_no_identity_without_cookie() -> Result<()> {
        let router = app(lazy_pool()?, test_auth_state()?)?;
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/v1/auth/session")
                    .body(Body::empty())
                    .map_err(anyhow::Error::from)?,
            )
            .await
            .map_err(|err| anyhow!("router error: {err:?}"))?;
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024).await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(value.get("success"), Some(&serde_json::json!(false)));
        Ok(())
    }
}
