//! # Supabase-compatible identity provider
//!
//! Talks to the GoTrue REST API (`/auth/v1`) with the project's service-role
//! key. The admin API can list users and fetch one by id, but cannot search
//! by email or metadata, so email lookup walks the user list page by page.

use std::time::Duration;

use async_trait::async_trait;
use domains::{Account, AccountDirectory, AccountId, AccountMetadata, AccountPage, TokenVerifier};
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

pub struct SupabaseDirectory {
    client: Client,
    base_url: String,
    service_key: SecretString,
    page_size: u32,
    max_pages: u32,
}

/// User object as returned by GoTrue.
#[derive(Debug, Deserialize)]
struct UserRecord {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<AccountMetadata>,
}

impl From<UserRecord> for Account {
    fn from(user: UserRecord) -> Self {
        Account {
            id: AccountId::new(user.id),
            email: user.email.unwrap_or_default(),
            metadata: user.user_metadata.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserList {
    #[serde(default)]
    users: Vec<UserRecord>,
}

impl SupabaseDirectory {
    pub fn new(
        base_url: impl Into<String>,
        service_key: SecretString,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key,
            page_size: 1000,
            max_pages: 50,
        })
    }

    /// Paging bounds used by the email walk.
    pub fn with_scan(mut self, page_size: u32, max_pages: u32) -> Self {
        self.page_size = page_size.max(1);
        self.max_pages = max_pages.max(1);
        self
    }

    fn admin(&self, builder: RequestBuilder) -> RequestBuilder {
        let key = self.service_key.expose_secret();
        builder.header("apikey", key).bearer_auth(key)
    }
}

#[async_trait]
impl AccountDirectory for SupabaseDirectory {
    async fn list_accounts(&self, page: u32, per_page: u32) -> anyhow::Result<AccountPage> {
        let url = format!("{}/auth/v1/admin/users", self.base_url);
        let list: UserList = self
            .admin(self.client.get(url))
            .query(&[("page", page), ("per_page", per_page)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let has_more = list.users.len() as u32 >= per_page;
        Ok(AccountPage {
            accounts: list.users.into_iter().map(Account::from).collect(),
            has_more,
        })
    }

    async fn account_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        for page in 1..=self.max_pages {
            let batch = self.list_accounts(page, self.page_size).await?;
            if let Some(found) = batch
                .accounts
                .into_iter()
                .find(|a| a.email.eq_ignore_ascii_case(email))
            {
                return Ok(Some(found));
            }
            if !batch.has_more {
                return Ok(None);
            }
        }
        warn!(max_pages = self.max_pages, "email lookup hit its page bound");
        Ok(None)
    }

    async fn account_by_id(&self, id: &AccountId) -> anyhow::Result<Option<Account>> {
        let url = format!("{}/auth/v1/admin/users/{}", self.base_url, id);
        let response = self.admin(self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let user: UserRecord = response.error_for_status()?.json().await?;
        Ok(Some(user.into()))
    }
}

#[async_trait]
impl TokenVerifier for SupabaseDirectory {
    async fn account_by_token(&self, token: &str) -> anyhow::Result<Option<Account>> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let response = self
            .client
            .get(url)
            .header("apikey", self.service_key.expose_secret())
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                debug!(status = %response.status(), "identity provider rejected token");
                Ok(None)
            }
            _ => {
                let user: UserRecord = response.error_for_status()?.json().await?;
                Ok(Some(user.into()))
            }
        }
    }
}
