//! A fixed directory loaded from JSON, for local development and tests.
//!
//! ```json
//! {
//!   "accounts": [{ "id": "1", "email": "alice@example.com", "metadata": { "username": "alice" } }],
//!   "tokens": { "dev-token-alice": "1" }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use domains::{Account, AccountDirectory, AccountId, AccountPage, TokenVerifier};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct Seed {
    #[serde(default)]
    accounts: Vec<Account>,
    #[serde(default)]
    tokens: HashMap<String, AccountId>,
}

#[derive(Debug, Default)]
pub struct StaticDirectory {
    accounts: Vec<Account>,
    tokens: HashMap<String, AccountId>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let seed: Seed = serde_json::from_str(json)?;
        Ok(Self { accounts: seed.accounts, tokens: seed.tokens })
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Adds an account reachable with `token`.
    pub fn with_account(mut self, account: Account, token: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), account.id.clone());
        self.accounts.push(account);
        self
    }

    fn by_id(&self, id: &AccountId) -> Option<Account> {
        self.accounts.iter().find(|a| &a.id == id).cloned()
    }
}

#[async_trait]
impl AccountDirectory for StaticDirectory {
    async fn list_accounts(&self, page: u32, per_page: u32) -> anyhow::Result<AccountPage> {
        let per_page = per_page.max(1) as usize;
        let start = (page.max(1) as usize - 1) * per_page;
        let accounts: Vec<Account> = self.accounts.iter().skip(start).take(per_page).cloned().collect();
        Ok(AccountPage {
            has_more: start + accounts.len() < self.accounts.len(),
            accounts,
        })
    }

    async fn account_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        Ok(self
            .accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn account_by_id(&self, id: &AccountId) -> anyhow::Result<Option<Account>> {
        Ok(self.by_id(id))
    }
}

#[async_trait]
impl TokenVerifier for StaticDirectory {
    async fn account_by_token(&self, token: &str) -> anyhow::Result<Option<Account>> {
        Ok(self.tokens.get(token).and_then(|id| self.by_id(id)))
    }
}
