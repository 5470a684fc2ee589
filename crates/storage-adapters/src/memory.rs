//! # In-memory Message Store
//!
//! A process-local implementation of the storage ports, used for local
//! development (`database.url = "memory"`) and tests. Nothing survives a
//! restart.

use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use domains::{
    AccountId, Feedback, FeedbackRepo, Message, MessageRepo, MessageType, NewFeedback, NewMessage,
};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    messages: DashMap<Uuid, Message>,
    feedback: DashMap<Uuid, Feedback>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages satisfying `keep`, newest first.
    fn select(&self, keep: impl Fn(&Message) -> bool) -> Vec<Message> {
        let mut selected: Vec<Message> = self
            .messages
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        selected.sort_by_key(|m| Reverse((m.created_at, m.id)));
        selected
    }

    pub fn feedback_count(&self) -> usize {
        self.feedback.len()
    }
}

#[async_trait]
impl MessageRepo for MemoryStore {
    async fn insert(&self, new: NewMessage) -> anyhow::Result<Message> {
        let message = Message::from_new(new, Uuid::now_v7(), Utc::now());
        self.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Message>> {
        Ok(self.messages.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_sender_receiver_type(
        &self,
        sender: &AccountId,
        receiver: &AccountId,
        message_type: MessageType,
    ) -> anyhow::Result<Vec<Message>> {
        Ok(self.select(|m| {
            &m.sender_id == sender
                && m.receiver_id.as_ref() == Some(receiver)
                && m.message_type == message_type
        }))
    }

    async fn list_incoming(&self, receiver: &AccountId) -> anyhow::Result<Vec<Message>> {
        Ok(self.select(|m| m.receiver_id.as_ref() == Some(receiver)))
    }

    async fn list_outgoing(&self, sender: &AccountId) -> anyhow::Result<Vec<Message>> {
        Ok(self.select(|m| &m.sender_id == sender))
    }

    async fn list_recent_outgoing(&self, sender: &AccountId, limit: usize) -> anyhow::Result<Vec<Message>> {
        let mut recent = self.select(|m| &m.sender_id == sender);
        recent.truncate(limit);
        Ok(recent)
    }

    async fn delete_owned(&self, id: Uuid, requester: &AccountId) -> anyhow::Result<bool> {
        Ok(self
            .messages
            .remove_if(&id, |_, m| m.is_party(requester))
            .is_some())
    }

    async fn mark_read(&self, id: Uuid, receiver: &AccountId) -> anyhow::Result<bool> {
        match self.messages.get_mut(&id) {
            Some(mut entry) if entry.receiver_id.as_ref() == Some(receiver) => {
                entry.read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl FeedbackRepo for MemoryStore {
    async fn insert_feedback(&self, feedback: NewFeedback) -> anyhow::Result<Feedback> {
        let stored = Feedback {
            id: Uuid::now_v7(),
            email: feedback.email,
            content: feedback.content,
            created_at: Utc::now(),
        };
        self.feedback.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{Channels, ReceiverMethod};
    use tokio_test::assert_ok;

    fn new_message(from: &str, to: &str, message_type: MessageType) -> NewMessage {
        NewMessage {
            sender_id: from.into(),
            receiver_id: Some(to.into()),
            receiver_identifier: to.into(),
            receiver_method: ReceiverMethod::Username,
            message_type,
            title: "t".into(),
            content: "c".into(),
            is_anonymous: false,
            channels: Channels::default(),
        }
    }

    #[tokio::test]
    async fn behaves_like_an_owner_scoped_store() {
        let store = MemoryStore::new();
        let a = assert_ok!(store.insert(new_message("bob", "alice", MessageType::Share)).await);
        let b = assert_ok!(store.insert(new_message("bob", "alice", MessageType::Confess)).await);

        let incoming = store.list_incoming(&"alice".into()).await.unwrap();
        assert_eq!(incoming.iter().map(|m| m.id).collect::<Vec<_>>(), vec![b.id, a.id]);

        let recent = store.list_recent_outgoing(&"bob".into(), 1).await.unwrap();
        assert_eq!(recent.iter().map(|m| m.id).collect::<Vec<_>>(), vec![b.id]);

        let typed = store
            .find_by_sender_receiver_type(&"bob".into(), &"alice".into(), MessageType::Share)
            .await
            .unwrap();
        assert_eq!(typed.len(), 1);

        assert!(!store.mark_read(a.id, &"bob".into()).await.unwrap());
        assert!(store.mark_read(a.id, &"alice".into()).await.unwrap());

        assert!(!store.delete_owned(a.id, &"carol".into()).await.unwrap());
        assert!(store.delete_owned(a.id, &"bob".into()).await.unwrap());
        assert!(store.find_by_id(a.id).await.unwrap().is_none());
    }
}
