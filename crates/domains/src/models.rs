//! # Domain Models
//!
//! These structs represent the core entities of HeartConnect.
//! Accounts belong to the identity provider and are read-only here;
//! messages are owned by the message store. Matches are never stored,
//! they are derived from pairs of messages on demand.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Opaque identifier assigned to an account by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AccountId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Profile fields the identity provider keeps next to the login email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMetadata {
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Link to a social profile. Older clients call this `facebook`.
    #[serde(default, alias = "facebook")]
    pub profile_link: Option<String>,
}

/// A registered user identity, as returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    #[serde(default)]
    pub metadata: AccountMetadata,
}

impl Account {
    /// Best human-readable name: full name, then username, then email.
    pub fn display_name(&self) -> &str {
        non_blank(&self.metadata.fullname)
            .or_else(|| non_blank(&self.metadata.username))
            .unwrap_or(&self.email)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// One page of the account directory.
#[derive(Debug, Clone, Default)]
pub struct AccountPage {
    pub accounts: Vec<Account>,
    pub has_more: bool,
}

/// Emotional classification of a message. Matching treats it as an opaque key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Share,
    Confess,
    Reconnect,
}

impl MessageType {
    pub const ALL: [MessageType; 3] = [Self::Share, Self::Confess, Self::Reconnect];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Share => "share",
            Self::Confess => "confess",
            Self::Reconnect => "reconnect",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("unknown message type '{s}'")))
    }
}

/// How the sender identified the recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReceiverMethod {
    Username,
    Email,
    Phone,
    #[serde(alias = "facebook")]
    ProfileLink,
}

impl ReceiverMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::ProfileLink => "profileLink",
        }
    }
}

impl fmt::Display for ReceiverMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceiverMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "username" => Ok(Self::Username),
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "profileLink" | "facebook" => Ok(Self::ProfileLink),
            other => Err(AppError::Validation(format!("unknown receiver method '{other}'"))),
        }
    }
}

/// Delivery channels requested by the sender. SMS is accepted but never delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Channels {
    pub inbox: bool,
    pub email: bool,
    pub sms: bool,
}

impl Default for Channels {
    fn default() -> Self {
        Self { inbox: true, email: false, sms: false }
    }
}

/// What an authenticated sender asks for when sending.
#[derive(Debug, Clone)]
pub struct SendMessage {
    pub receiver_identifier: String,
    pub receiver_method: ReceiverMethod,
    pub message_type: MessageType,
    pub title: String,
    pub content: String,
    pub is_anonymous: bool,
    pub channels: Channels,
}

/// A message ready to be persisted. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub sender_id: AccountId,
    /// Present iff the identifier resolved to an account at send time.
    pub receiver_id: Option<AccountId>,
    pub receiver_identifier: String,
    pub receiver_method: ReceiverMethod,
    pub message_type: MessageType,
    pub title: String,
    pub content: String,
    pub is_anonymous: bool,
    pub channels: Channels,
}

/// A persisted message. Immutable apart from `read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: AccountId,
    pub receiver_id: Option<AccountId>,
    pub receiver_identifier: String,
    pub receiver_method: ReceiverMethod,
    pub message_type: MessageType,
    pub title: String,
    pub content: String,
    pub is_anonymous: bool,
    pub channels: Channels,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Builds the stored form of `new` with the identity the store assigned.
    pub fn from_new(new: NewMessage, id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            sender_id: new.sender_id,
            receiver_id: new.receiver_id,
            receiver_identifier: new.receiver_identifier,
            receiver_method: new.receiver_method,
            message_type: new.message_type,
            title: new.title,
            content: new.content,
            is_anonymous: new.is_anonymous,
            channels: new.channels,
            read: false,
            created_at,
        }
    }

    pub fn receiver_found(&self) -> bool {
        self.receiver_id.is_some()
    }

    /// True when `account` is the sender or the resolved receiver.
    pub fn is_party(&self, account: &AccountId) -> bool {
        &self.sender_id == account || self.receiver_id.as_ref() == Some(account)
    }

    /// True when the message is addressed to its own sender.
    pub fn is_self_addressed(&self) -> bool {
        self.receiver_id.as_ref() == Some(&self.sender_id)
    }

    /// The match relation: `self` and `other` run in opposite directions
    /// between two distinct resolved accounts and share a message type.
    pub fn reciprocates(&self, other: &Message) -> bool {
        match (&self.receiver_id, &other.receiver_id) {
            (Some(to), Some(back)) => {
                self.message_type == other.message_type
                    && to == &other.sender_id
                    && back == &self.sender_id
                    && self.sender_id != other.sender_id
            }
            _ => false,
        }
    }
}

/// Sender identity as shown to a receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderInfo {
    pub id: Option<AccountId>,
    pub display_name: String,
    pub username: Option<String>,
    pub profile_link: Option<String>,
}

impl SenderInfo {
    pub const ANONYMOUS_NAME: &'static str = "Anonymous";

    /// Placeholder that carries nothing resolvable back to the sender.
    pub fn anonymous() -> Self {
        Self {
            id: None,
            display_name: Self::ANONYMOUS_NAME.to_string(),
            username: None,
            profile_link: None,
        }
    }

    pub fn from_account(account: &Account) -> Self {
        Self {
            id: Some(account.id.clone()),
            display_name: account.display_name().to_string(),
            username: account.metadata.username.clone(),
            profile_link: account.metadata.profile_link.clone(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_none() && self.display_name == Self::ANONYMOUS_NAME
    }
}

/// One visible row of a user's matched inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxEntry {
    pub id: Uuid,
    /// `None` when the sender's account could no longer be looked up.
    pub sender: Option<SenderInfo>,
    pub title: String,
    pub content: String,
    pub message_type: MessageType,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// Result of a successful send.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub message: Message,
    pub receiver_found: bool,
    pub is_match: bool,
}

/// Payload handed to the notifier for one party of a fresh match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchNotice {
    pub recipient: Account,
    /// Counterpart's display name, withheld when they sent anonymously.
    pub counterpart_name: Option<String>,
    pub message_type: MessageType,
}

/// Payload for the plain "you have a new message" email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessageNotice {
    pub to: String,
    pub title: String,
    pub content: String,
    pub message_type: MessageType,
}

/// Free-form product feedback submitted from the public site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedback {
    pub email: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub email: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
