use crate::api::{
    self,
    email::{EmailSender, HttpEmailSender, LogEmailSender},
    handlers::auth::{AuthConfig, SessionSigner},
};
use crate::cli::actions::Action;
use anyhow::{Context, Result};
use std::sync::Arc;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            session_secret,
            base_url,
            email_url,
        } => {
            // Fail fast on a malformed DSN instead of at first pool checkout
            let dsn = Url::parse(&dsn).context("Invalid database DSN")?;

            let config = AuthConfig::new(base_url);

            // Missing or empty signing secret is a fatal configuration error,
            // not something to limp along without.
            let signer = SessionSigner::new(&session_secret, config.session_ttl_seconds())?;

            let mailer: Arc<dyn EmailSender> = match email_url {
                Some(url) => Arc::new(HttpEmailSender::new(&url)?),
                None => Arc::new(LogEmailSender),
            };

            api::new(port, dsn.to_string(), config, signer, mailer).await?;
        }
    }

    Ok(())
}
