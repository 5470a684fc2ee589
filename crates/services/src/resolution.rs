//! # Receiver Resolution
//!
//! Maps the identifier a sender typed to a registered account.
//!
//! The directory is only indexed by id and email, so every other method
//! walks the whole directory page by page. This is O(accounts) per send and
//! is bounded by [`DirectoryScan::max_pages`].

use std::sync::Arc;

use domains::{Account, AccountDirectory, AppError, ReceiverMethod, Result};
use tracing::{debug, warn};

/// Paging bounds for a full directory walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryScan {
    pub page_size: u32,
    pub max_pages: u32,
}

impl Default for DirectoryScan {
    fn default() -> Self {
        Self { page_size: 1000, max_pages: 50 }
    }
}

pub struct ReceiverResolver {
    directory: Arc<dyn AccountDirectory>,
    scan: DirectoryScan,
}

impl ReceiverResolver {
    pub fn new(directory: Arc<dyn AccountDirectory>, scan: DirectoryScan) -> Self {
        Self { directory, scan }
    }

    /// Resolves `identifier` under `method`. `Ok(None)` is a resolution miss,
    /// not an error; directory failures are.
    #[tracing::instrument(skip_all, fields(method = %method))]
    pub async fn resolve(&self, method: ReceiverMethod, identifier: &str) -> Result<Option<Account>> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(None);
        }

        if method == ReceiverMethod::Email {
            return self
                .directory
                .account_by_email(&identifier.to_lowercase())
                .await
                .map_err(AppError::directory);
        }

        self.scan_for(|account| matches_identifier(method, identifier, account))
            .await
    }

    async fn scan_for<F>(&self, predicate: F) -> Result<Option<Account>>
    where
        F: Fn(&Account) -> bool,
    {
        for page in 1..=self.scan.max_pages {
            let batch = self
                .directory
                .list_accounts(page, self.scan.page_size)
                .await
                .map_err(AppError::directory)?;

            if let Some(found) = batch.accounts.into_iter().find(|a| predicate(a)) {
                debug!(page, "receiver resolved");
                return Ok(Some(found));
            }
            if !batch.has_more {
                return Ok(None);
            }
        }

        warn!(
            max_pages = self.scan.max_pages,
            page_size = self.scan.page_size,
            "directory scan hit its page bound; treating receiver as unregistered"
        );
        Ok(None)
    }
}

/// The per-method comparison used while walking the directory.
///
/// Username and email compare case-insensitively, phone compares exactly,
/// and a profile link matches when the identifier is a substring of the
/// stored link.
pub fn matches_identifier(method: ReceiverMethod, identifier: &str, account: &Account) -> bool {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return false;
    }
    let meta = &account.metadata;
    match method {
        ReceiverMethod::Username => meta
            .username
            .as_deref()
            .is_some_and(|u| u.trim().to_lowercase() == identifier.to_lowercase()),
        ReceiverMethod::Email => account.email.trim().to_lowercase() == identifier.to_lowercase(),
        ReceiverMethod::Phone => meta.phone.as_deref().is_some_and(|p| p.trim() == identifier),
        ReceiverMethod::ProfileLink => meta
            .profile_link
            .as_deref()
            .is_some_and(|link| link.contains(identifier)),
    }
}
