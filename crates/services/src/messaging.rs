//! # Message Service
//!
//! Orchestrates a send: validate, resolve the receiver, persist, detect a
//! match, notify. Each step waits on the one before it. A message that has
//! been persisted stays persisted even if a later step fails.

use std::sync::Arc;

use domains::{
    Account, AccountDirectory, AccountId, AppError, InboxEntry, MatchNotice, Message, MessageRepo,
    NewMessage, NewMessageNotice, Notifier, ReceiverMethod, Result, SendMessage, SendOutcome,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::inbox::InboxBuilder;
use crate::matching::{MatchDetector, PairLocks};
use crate::resolution::{DirectoryScan, ReceiverResolver};
use crate::validation::validate_send;

/// How many messages the sent view returns.
pub const SENT_VIEW_LIMIT: usize = 50;

pub struct MessageService {
    repo: Arc<dyn MessageRepo>,
    notifier: Arc<dyn Notifier>,
    resolver: ReceiverResolver,
    detector: MatchDetector,
    inbox: InboxBuilder,
    pair_locks: PairLocks,
}

impl MessageService {
    pub fn new(
        repo: Arc<dyn MessageRepo>,
        directory: Arc<dyn AccountDirectory>,
        notifier: Arc<dyn Notifier>,
        scan: DirectoryScan,
    ) -> Self {
        Self {
            resolver: ReceiverResolver::new(Arc::clone(&directory), scan),
            detector: MatchDetector::new(Arc::clone(&repo)),
            inbox: InboxBuilder::new(Arc::clone(&repo), directory),
            pair_locks: PairLocks::new(),
            repo,
            notifier,
        }
    }

    /// Sends a message on behalf of the authenticated `sender`.
    #[tracing::instrument(
        skip_all,
        fields(sender = %sender.id, method = %request.receiver_method, message_type = %request.message_type)
    )]
    pub async fn send(&self, sender: &Account, request: SendMessage) -> Result<SendOutcome> {
        validate_send(&request)?;

        let receiver = self
            .resolver
            .resolve(request.receiver_method, &request.receiver_identifier)
            .await?;

        let new_message = NewMessage {
            sender_id: sender.id.clone(),
            receiver_id: receiver.as_ref().map(|r| r.id.clone()),
            receiver_identifier: request.receiver_identifier,
            receiver_method: request.receiver_method,
            message_type: request.message_type,
            title: request.title,
            content: request.content,
            is_anonymous: request.is_anonymous,
            channels: request.channels,
        };

        let (message, reverse) = match &receiver {
            Some(receiver) => {
                let _pair = self.pair_locks.lock(&sender.id, &receiver.id).await;
                let message = self.insert(new_message).await?;
                let reverse = self.detector.reverse_messages(&message).await?;
                (message, reverse)
            }
            None => (self.insert(new_message).await?, Vec::new()),
        };

        let is_match = !reverse.is_empty();
        match (&receiver, reverse.first()) {
            (Some(receiver), Some(latest_reverse)) => {
                self.notify_match(sender, receiver, &message, latest_reverse).await;
            }
            _ => {
                if wants_new_message_email(&message) {
                    self.notify_new_message(&message).await;
                }
            }
        }

        info!(
            message_id = %message.id,
            receiver_found = receiver.is_some(),
            is_match,
            "message sent"
        );

        Ok(SendOutcome {
            receiver_found: receiver.is_some(),
            is_match,
            message,
        })
    }

    /// The caller's matched inbox.
    pub async fn inbox(&self, user: &AccountId) -> Result<Vec<InboxEntry>> {
        self.inbox.build(user).await
    }

    /// The caller's most recent outgoing messages.
    pub async fn sent(&self, user: &AccountId) -> Result<Vec<Message>> {
        self.repo
            .list_recent_outgoing(user, SENT_VIEW_LIMIT)
            .await
            .map_err(AppError::persistence)
    }

    /// Deletes a message the requester sent or received. Deleting one half
    /// of a match removes the match from both inboxes on their next build.
    #[tracing::instrument(skip_all, fields(message_id = %id, requester = %requester))]
    pub async fn delete(&self, id: Uuid, requester: &AccountId) -> Result<()> {
        let message = self.owned_message(id).await?;
        if !message.is_party(requester) {
            return Err(AppError::Forbidden("only the sender or receiver may delete a message".into()));
        }
        let removed = self
            .repo
            .delete_owned(id, requester)
            .await
            .map_err(AppError::persistence)?;
        if !removed {
            return Err(not_found(id));
        }
        info!(message_id = %id, "message deleted");
        Ok(())
    }

    /// Marks a received message as read. Only the resolved receiver may.
    #[tracing::instrument(skip_all, fields(message_id = %id, requester = %requester))]
    pub async fn mark_read(&self, id: Uuid, requester: &AccountId) -> Result<()> {
        let message = self.owned_message(id).await?;
        if message.receiver_id.as_ref() != Some(requester) {
            return Err(AppError::Forbidden("only the receiver may mark a message read".into()));
        }
        let updated = self
            .repo
            .mark_read(id, requester)
            .await
            .map_err(AppError::persistence)?;
        if !updated {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn owned_message(&self, id: Uuid) -> Result<Message> {
        self.repo
            .find_by_id(id)
            .await
            .map_err(AppError::persistence)?
            .ok_or_else(|| not_found(id))
    }

    async fn insert(&self, message: NewMessage) -> Result<Message> {
        self.repo.insert(message).await.map_err(AppError::persistence)
    }

    /// One notice per party. The counterpart is named only if their own
    /// half of the pair was not anonymous.
    async fn notify_match(&self, sender: &Account, receiver: &Account, sent: &Message, reverse: &Message) {
        let notices = [
            MatchNotice {
                recipient: sender.clone(),
                counterpart_name: (!reverse.is_anonymous).then(|| receiver.display_name().to_string()),
                message_type: sent.message_type,
            },
            MatchNotice {
                recipient: receiver.clone(),
                counterpart_name: (!sent.is_anonymous).then(|| sender.display_name().to_string()),
                message_type: sent.message_type,
            },
        ];
        for notice in notices {
            let recipient = notice.recipient.id.clone();
            if let Err(err) = self.notifier.match_detected(notice).await {
                warn!(recipient = %recipient, error = %err, "match notification failed");
            }
        }
    }

    async fn notify_new_message(&self, message: &Message) {
        let notice = NewMessageNotice {
            to: message.receiver_identifier.trim().to_string(),
            title: message.title.clone(),
            content: message.content.clone(),
            message_type: message.message_type,
        };
        if let Err(err) = self.notifier.new_message(notice).await {
            warn!(message_id = %message.id, error = %err, "new message notification failed");
        }
    }
}

fn wants_new_message_email(message: &Message) -> bool {
    message.channels.email && message.receiver_method == ReceiverMethod::Email
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound("Message".into(), id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{
        AccountMetadata, AccountPage, Channels, MessageType, MockAccountDirectory, MockMessageRepo,
        MockNotifier,
    };
    use tokio_test::assert_ok;

    fn account(id: &str, username: &str) -> Account {
        Account {
            id: id.into(),
            email: format!("{username}@example.com"),
            metadata: AccountMetadata {
                fullname: Some(format!("{username} full")),
                username: Some(username.into()),
                ..AccountMetadata::default()
            },
        }
    }

    fn request(identifier: &str, message_type: MessageType, anonymous: bool) -> SendMessage {
        SendMessage {
            receiver_identifier: identifier.into(),
            receiver_method: ReceiverMethod::Username,
            message_type,
            title: "Hi".into(),
            content: "...".into(),
            is_anonymous: anonymous,
            channels: Channels::default(),
        }
    }

    fn directory(accounts: Vec<Account>) -> MockAccountDirectory {
        let mut dir = MockAccountDirectory::new();
        dir.expect_list_accounts()
            .returning(move |_, _| Ok(AccountPage { accounts: accounts.clone(), has_more: false }));
        dir
    }

    fn stored(new: NewMessage) -> Message {
        Message::from_new(new, Uuid::now_v7(), Utc::now())
    }

    fn service(repo: MockMessageRepo, dir: MockAccountDirectory, notifier: MockNotifier) -> MessageService {
        MessageService::new(Arc::new(repo), Arc::new(dir), Arc::new(notifier), DirectoryScan::default())
    }

    #[tokio::test]
    async fn first_half_of_a_pair_is_not_a_match() {
        let mut repo = MockMessageRepo::new();
        repo.expect_insert().times(1).returning(|new| Ok(stored(new)));
        repo.expect_find_by_sender_receiver_type()
            .returning(|_, _, _| Ok(vec![]));
        let mut notifier = MockNotifier::new();
        notifier.expect_match_detected().never();
        notifier.expect_new_message().never();

        let svc = service(repo, directory(vec![account("2", "bob")]), notifier);
        let outcome = svc
            .send(&account("1", "alice"), request("bob", MessageType::Confess, false))
            .await
            .unwrap();

        assert!(outcome.receiver_found);
        assert!(!outcome.is_match);
        assert_eq!(outcome.message.receiver_id, Some("2".into()));
    }

    #[tokio::test]
    async fn completing_send_notifies_both_parties_once() {
        let reverse = stored(NewMessage {
            sender_id: "2".into(),
            receiver_id: Some("1".into()),
            receiver_identifier: "alice".into(),
            receiver_method: ReceiverMethod::Username,
            message_type: MessageType::Confess,
            title: "Hey".into(),
            content: "...".into(),
            is_anonymous: true,
            channels: Channels::default(),
        });
        let mut repo = MockMessageRepo::new();
        repo.expect_insert().returning(|new| Ok(stored(new)));
        repo.expect_find_by_sender_receiver_type()
            .returning(move |_, _, _| Ok(vec![reverse.clone()]));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_match_detected()
            .withf(|n| n.recipient.id.as_str() == "1" && n.counterpart_name.is_none())
            .times(1)
            .returning(|_| Ok(()));
        notifier
            .expect_match_detected()
            .withf(|n| {
                n.recipient.id.as_str() == "2" && n.counterpart_name.as_deref() == Some("alice full")
            })
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("mail provider down")));
        notifier.expect_new_message().never();

        let svc = service(repo, directory(vec![account("2", "bob")]), notifier);
        let outcome = svc
            .send(&account("1", "alice"), request("bob", MessageType::Confess, false))
            .await
            .unwrap();
        assert!(outcome.is_match);
    }

    #[tokio::test]
    async fn unregistered_receiver_persists_without_match() {
        let mut repo = MockMessageRepo::new();
        repo.expect_insert()
            .withf(|new| new.receiver_id.is_none() && new.receiver_identifier == "ghost")
            .times(1)
            .returning(|new| Ok(stored(new)));
        repo.expect_find_by_sender_receiver_type().never();
        let mut notifier = MockNotifier::new();
        notifier.expect_match_detected().never();

        let svc = service(repo, directory(vec![account("2", "bob")]), notifier);
        let outcome = svc
            .send(&account("1", "alice"), request("ghost", MessageType::Share, false))
            .await
            .unwrap();
        assert!(!outcome.receiver_found);
        assert!(!outcome.is_match);
    }

    #[tokio::test]
    async fn email_channel_sends_plain_notice_when_no_match() {
        let mut repo = MockMessageRepo::new();
        repo.expect_insert().returning(|new| Ok(stored(new)));
        let mut dir = MockAccountDirectory::new();
        dir.expect_account_by_email().returning(|_| Ok(None));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_new_message()
            .withf(|n| n.to == "Someone@Example.com" && n.title == "Hi")
            .times(1)
            .returning(|_| Ok(()));

        let mut req = request(" Someone@Example.com", MessageType::Share, true);
        req.receiver_method = ReceiverMethod::Email;
        req.channels = Channels { inbox: true, email: true, sms: false };

        let outcome = service(repo, dir, notifier)
            .send(&account("1", "alice"), req)
            .await
            .unwrap();
        assert_eq!(outcome.message.receiver_identifier, " Someone@Example.com");
    }

    #[tokio::test]
    async fn invalid_request_has_no_side_effects() {
        let mut repo = MockMessageRepo::new();
        repo.expect_insert().never();
        let mut dir = MockAccountDirectory::new();
        dir.expect_list_accounts().never();

        let mut req = request("bob", MessageType::Share, false);
        req.content = "   ".into();
        let err = service(repo, dir, MockNotifier::new())
            .send(&account("1", "alice"), req)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn insert_failure_aborts_the_send() {
        let mut repo = MockMessageRepo::new();
        repo.expect_insert()
            .returning(|_| Err(anyhow::anyhow!("constraint violated")));
        repo.expect_find_by_sender_receiver_type().never();
        let mut notifier = MockNotifier::new();
        notifier.expect_match_detected().never();

        let err = service(repo, directory(vec![account("2", "bob")]), notifier)
            .send(&account("1", "alice"), request("bob", MessageType::Share, false))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
    }

    fn existing(sender: &str, receiver: &str) -> Message {
        stored(NewMessage {
            sender_id: sender.into(),
            receiver_id: Some(receiver.into()),
            receiver_identifier: receiver.into(),
            receiver_method: ReceiverMethod::Username,
            message_type: MessageType::Share,
            title: "t".into(),
            content: "c".into(),
            is_anonymous: false,
            channels: Channels::default(),
        })
    }

    #[tokio::test]
    async fn delete_distinguishes_missing_from_forbidden() {
        let msg = existing("1", "2");
        let id = msg.id;
        let mut repo = MockMessageRepo::new();
        repo.expect_find_by_id()
            .returning(move |lookup| Ok((lookup == msg.id).then(|| msg.clone())));
        repo.expect_delete_owned()
            .withf(move |target, requester| *target == id && requester.as_str() == "2")
            .times(1)
            .returning(|_, _| Ok(true));

        let svc = service(repo, MockAccountDirectory::new(), MockNotifier::new());

        let missing = svc.delete(Uuid::now_v7(), &"1".into()).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_, _)));

        let stranger = svc.delete(id, &"3".into()).await.unwrap_err();
        assert!(matches!(stranger, AppError::Forbidden(_)));

        assert_ok!(svc.delete(id, &"2".into()).await);
    }

    #[tokio::test]
    async fn only_the_receiver_marks_read() {
        let msg = existing("1", "2");
        let id = msg.id;
        let mut repo = MockMessageRepo::new();
        repo.expect_find_by_id().returning(move |_| Ok(Some(msg.clone())));
        repo.expect_mark_read().times(1).returning(|_, _| Ok(true));

        let svc = service(repo, MockAccountDirectory::new(), MockNotifier::new());
        assert!(matches!(
            svc.mark_read(id, &"1".into()).await.unwrap_err(),
            AppError::Forbidden(_)
        ));
        assert_ok!(svc.mark_read(id, &"2".into()).await);
    }

    #[tokio::test]
    async fn sent_view_asks_the_store_for_a_capped_page() {
        let page: Vec<Message> = (0..3).map(|_| existing("1", "2")).collect();
        let mut repo = MockMessageRepo::new();
        repo.expect_list_outgoing().never();
        repo.expect_list_recent_outgoing()
            .withf(|sender, limit| sender.as_str() == "1" && *limit == SENT_VIEW_LIMIT)
            .times(1)
            .returning(move |_, _| Ok(page.clone()));
        let svc = service(repo, MockAccountDirectory::new(), MockNotifier::new());
        assert_eq!(svc.sent(&"1".into()).await.unwrap().len(), 3);
    }
}
