//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be wired into the binary.
//! Failures are reported as `anyhow::Error`; services decide how each one
//! surfaces to the caller.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Account, AccountId, AccountPage, Feedback, Message, MatchNotice, MessageType, NewFeedback,
    NewMessage, NewMessageNotice,
};

/// Persistence contract for messages.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MessageRepo: Send + Sync {
    /// Persists a message, assigning its id and creation timestamp.
    async fn insert(&self, message: NewMessage) -> anyhow::Result<Message>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Message>>;

    /// Equality lookup on `(sender_id, receiver_id, message_type)`.
    async fn find_by_sender_receiver_type(
        &self,
        sender: &AccountId,
        receiver: &AccountId,
        message_type: MessageType,
    ) -> anyhow::Result<Vec<Message>>;

    /// Messages addressed to `receiver`, newest first.
    async fn list_incoming(&self, receiver: &AccountId) -> anyhow::Result<Vec<Message>>;

    /// Messages written by `sender`, newest first.
    async fn list_outgoing(&self, sender: &AccountId) -> anyhow::Result<Vec<Message>>;

    /// At most `limit` of `sender`'s messages, newest first.
    async fn list_recent_outgoing(&self, sender: &AccountId, limit: usize) -> anyhow::Result<Vec<Message>>;

    /// Deletes the message only if `requester` is its sender or receiver.
    /// Returns whether a row was removed.
    async fn delete_owned(&self, id: Uuid, requester: &AccountId) -> anyhow::Result<bool>;

    /// Flags the message read only if `receiver` is its resolved receiver.
    /// Returns whether a row matched.
    async fn mark_read(&self, id: Uuid, receiver: &AccountId) -> anyhow::Result<bool>;
}

/// Read access to the identity provider's account directory.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// One page of all registered accounts. Pages start at 1.
    async fn list_accounts(&self, page: u32, per_page: u32) -> anyhow::Result<AccountPage>;

    /// Looks up an account by its primary email (already lowercased).
    async fn account_by_email(&self, email: &str) -> anyhow::Result<Option<Account>>;

    async fn account_by_id(&self, id: &AccountId) -> anyhow::Result<Option<Account>>;
}

/// Bearer-token verification, delegated to the identity provider.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Returns the account the token belongs to, or `None` if it is invalid.
    async fn account_by_token(&self, token: &str) -> anyhow::Result<Option<Account>>;
}

/// Outbound alerting. Callers treat every failure as non-fatal.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tells one party of a fresh match about it.
    async fn match_detected(&self, notice: MatchNotice) -> anyhow::Result<()>;

    /// Plain "you have a new message" delivery for the email channel.
    async fn new_message(&self, notice: NewMessageNotice) -> anyhow::Result<()>;
}

/// Persistence contract for site feedback.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait FeedbackRepo: Send + Sync {
    async fn insert_feedback(&self, feedback: NewFeedback) -> anyhow::Result<Feedback>;
}
