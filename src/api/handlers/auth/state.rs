//! Auth configuration and shared handler state.

use std::sync::Arc;

use crate::api::email::EmailSender;

use super::rate_limit::RateLimiter;
use super::session::SessionSigner;

const DEFAULT_CODE_TTL_SECONDS: i64 = 10 * 60;
const DEFAULT_SESSION_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    base_url: String,
    code_ttl_seconds: i64,
    session_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            code_ttl_seconds: DEFAULT_CODE_TTL_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_code_ttl_seconds(mut self, seconds: i64) -> Self {
        self.code_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(super) fn code_ttl_seconds(&self) -> i64 {
        self.code_ttl_seconds
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    pub(super) fn session_cookie_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

pub struct AuthState {
    config: AuthConfig,
    signer: SessionSigner,
    mailer: Arc<dyn EmailSender>,
    rate_limiter: Arc<dyn RateLimiter>,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        signer: SessionSigner,
        mailer: Arc<dyn EmailSender>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            config,
            signer,
            mailer,
            rate_limiter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn signer(&self) -> &SessionSigner {
        &self.signer
    }

    pub(super) fn mailer(&self) -> &dyn EmailSender {
        self.mailer.as_ref()
    }

    pub(super) fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::super::rate_limit::{NoopRateLimiter, RateLimiter};
    use super::super::session::SessionSigner;
    use super::{AuthConfig, AuthState};
    use crate::api::email::LogEmailSender;
    use anyhow::Result;
    use secrecy::SecretString;
    use std::sync::Arc;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new("https://scoutline.app".to_string());

        assert_eq!(config.base_url(), "https://scoutline.app");
        assert_eq!(config.code_ttl_seconds(), super::DEFAULT_CODE_TTL_SECONDS);
        assert_eq!(
            config.session_ttl_seconds(),
            super::DEFAULT_SESSION_TTL_SECONDS
        );
        assert!(config.session_cookie_secure());

        let config = config
            .with_code_ttl_seconds(60)
            .with_session_ttl_seconds(3600);
        assert_eq!(config.code_ttl_seconds(), 60);
        assert_eq!(config.session_ttl_seconds(), 3600);
    }

    #[test]
    fn plain_http_base_url_disables_secure_cookie() {
        let config = AuthConfig::new("http://localhost:3000".to_string());
        assert!(!config.session_cookie_secure());
    }

    #[test]
    fn auth_state_exposes_parts() -> Result<()> {
        let config = AuthConfig::new("https://scoutline.app".to_string());
        let signer = SessionSigner::new(
            &SecretString::from("unit-test-secret"),
            config.session_ttl_seconds(),
        )?;
        let limiter: Arc<dyn RateLimiter> = Arc::new(NoopRateLimiter);
        let state = AuthState::new(config, signer, Arc::new(LogEmailSender), limiter);
        assert_eq!(state.config().base_url(), "https://scoutline.app");
        Ok(())
    }
}
