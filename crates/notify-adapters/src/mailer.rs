//! # Mail transports
//!
//! A [`Mailer`] delivers one rendered [`Email`]. Rendering lives in
//! [`crate::EmailNotifier`]; transports only move bytes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::info;

/// Wire shape accepted by Resend's `POST /emails`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> anyhow::Result<()>;
}

pub struct ResendMailer {
    client: Client,
    api_url: String,
    api_key: SecretString,
}

impl ResendMailer {
    pub fn new(api_url: impl Into<String>, api_key: SecretString, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_url: api_url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        self.client
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&email)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Drops each email, logging only that one was due. Addresses and subjects
/// never reach the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        info!(
            recipients = email.to.len(),
            html_bytes = email.html.len(),
            "email delivery disabled; not sent"
        );
        Ok(())
    }
}
