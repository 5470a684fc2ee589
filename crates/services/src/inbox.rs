//! # Inbox View Builder
//!
//! The inbox is the set of current matches, not every incoming message: an
//! incoming message is visible only while the owner has sent the same
//! type of message back to its sender.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use domains::{
    AccountDirectory, AccountId, AppError, InboxEntry, Message, MessageRepo, MessageType, Result,
    SenderInfo,
};
use tracing::warn;

pub struct InboxBuilder {
    repo: Arc<dyn MessageRepo>,
    directory: Arc<dyn AccountDirectory>,
}

impl InboxBuilder {
    pub fn new(repo: Arc<dyn MessageRepo>, directory: Arc<dyn AccountDirectory>) -> Self {
        Self { repo, directory }
    }

    /// Matched incoming messages for `user`, newest first.
    #[tracing::instrument(skip_all, fields(user = %user))]
    pub async fn build(&self, user: &AccountId) -> Result<Vec<InboxEntry>> {
        let incoming = self.repo.list_incoming(user).await.map_err(AppError::persistence)?;
        let outgoing = self.repo.list_outgoing(user).await.map_err(AppError::persistence)?;

        let visible = filter_matched(incoming, &outgoing);

        let mut senders: HashMap<AccountId, Option<SenderInfo>> = HashMap::new();
        let mut entries = Vec::with_capacity(visible.len());
        for message in visible {
            // Anonymous senders are never looked up.
            let sender = if message.is_anonymous {
                Some(SenderInfo::anonymous())
            } else {
                self.sender_info(&message.sender_id, &mut senders).await
            };
            entries.push(InboxEntry {
                id: message.id,
                sender,
                title: message.title,
                content: message.content,
                message_type: message.message_type,
                is_anonymous: message.is_anonymous,
                created_at: message.created_at,
                read: message.read,
            });
        }
        Ok(entries)
    }

    async fn sender_info(
        &self,
        sender: &AccountId,
        cache: &mut HashMap<AccountId, Option<SenderInfo>>,
    ) -> Option<SenderInfo> {
        if let Some(known) = cache.get(sender) {
            return known.clone();
        }
        let info = match self.directory.account_by_id(sender).await {
            Ok(account) => account.as_ref().map(SenderInfo::from_account),
            Err(err) => {
                warn!(sender = %sender, error = %err, "sender lookup failed; showing entry without sender");
                None
            }
        };
        cache.insert(sender.clone(), info.clone());
        info
    }
}

/// Keeps the incoming messages that `outgoing` reciprocates, preserving order.
pub fn filter_matched(incoming: Vec<Message>, outgoing: &[Message]) -> Vec<Message> {
    let sent_back: HashSet<(&AccountId, MessageType)> = outgoing
        .iter()
        .filter(|m| !m.is_self_addressed())
        .filter_map(|m| m.receiver_id.as_ref().map(|to| (to, m.message_type)))
        .collect();

    incoming
        .into_iter()
        .filter(|m| !m.is_self_addressed())
        .filter(|m| sent_back.contains(&(&m.sender_id, m.message_type)))
        .collect()
}
