//! Outbound email collaborator for one-time code delivery.
//!
//! The auth handlers only know the [`EmailSender`] trait; deployments pick
//! the delivery mechanism at startup. Template rendering is owned by the
//! delivery endpoint, not by this service.

use crate::APP_USER_AGENT;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

/// What kind of code an email carries; selects the template downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeKind {
    Login,
    Signup,
    Reset,
}

impl CodeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Signup => "signup",
            Self::Reset => "reset",
        }
    }
}

#[derive(Clone, Debug)]
pub struct CodeEmail {
    pub to_email: String,
    pub code: String,
    pub kind: CodeKind,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &CodeEmail) -> Result<()>;
}

/// Logs instead of sending; the default for local development.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &CodeEmail) -> Result<()> {
        info!(
            to_email = %message.to_email,
            kind = message.kind.as_str(),
            code = %message.code,
            "email send stub"
        );
        Ok(())
    }
}

/// Posts the code to an external delivery endpoint.
#[derive(Clone, Debug)]
pub struct HttpEmailSender {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpEmailSender {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .context("failed to build email client")?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
        })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: &CodeEmail) -> Result<()> {
        let payload = json!({
            "to_email": message.to_email,
            "template": format!("{}_code", message.kind.as_str()),
            "code": message.code,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .context("failed to reach email endpoint")?;

        if !response.status().is_success() {
            anyhow::bail!("email endpoint returned {}", response.status());
        }

        Ok(())
    }
}
