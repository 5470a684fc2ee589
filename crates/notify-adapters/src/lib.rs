//! # notify-adapters
//!
//! Notification dispatch over email: askama-rendered bodies and pluggable
//! transports.

pub mod mailer;
pub mod notifier;

pub use mailer::{Email, LogMailer, Mailer, ResendMailer};
pub use notifier::{kind_phrase, EmailNotifier};
