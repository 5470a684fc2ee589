//! # Match Detector
//!
//! A match is two messages running in opposite directions between the same
//! two registered accounts with the same message type. Nothing is stored;
//! every check re-reads the message store.

use std::sync::Arc;

use dashmap::DashMap;
use domains::{AccountId, AppError, Message, MessageRepo, Result};
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct MatchDetector {
    repo: Arc<dyn MessageRepo>,
}

impl MatchDetector {
    pub fn new(repo: Arc<dyn MessageRepo>) -> Self {
        Self { repo }
    }

    /// Whether `sent` completes a pair with a message already in the store.
    pub async fn detect(&self, sent: &Message) -> Result<bool> {
        Ok(!self.reverse_messages(sent).await?.is_empty())
    }

    /// Every stored message that `sent` reciprocates, newest first.
    ///
    /// Unresolved and self-addressed messages short-circuit to no match.
    #[tracing::instrument(skip_all, fields(message_id = %sent.id))]
    pub async fn reverse_messages(&self, sent: &Message) -> Result<Vec<Message>> {
        let receiver = match &sent.receiver_id {
            Some(receiver) if !sent.is_self_addressed() => receiver,
            _ => return Ok(Vec::new()),
        };

        let candidates = self
            .repo
            .find_by_sender_receiver_type(receiver, &sent.sender_id, sent.message_type)
            .await
            .map_err(AppError::persistence)?;

        Ok(candidates.into_iter().filter(|m| sent.reciprocates(m)).collect())
    }
}

/// Async mutexes keyed by the unordered pair of accounts in a send.
///
/// Holding the pair lock across insert and reverse lookup means that of two
/// racing sends that complete the same pair, exactly one sees the other.
#[derive(Default)]
pub struct PairLocks {
    locks: DashMap<(AccountId, AccountId), Arc<Mutex<()>>>,
}

impl PairLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, a: &AccountId, b: &AccountId) -> PairGuard<'_> {
        let key = if a <= b { (a.clone(), b.clone()) } else { (b.clone(), a.clone()) };
        let mutex = self.locks.entry(key.clone()).or_default().clone();
        let guard = mutex.lock_owned().await;
        PairGuard { owner: self, key, guard: Some(guard) }
    }

    /// Number of pairs with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Releases the pair lock on drop and forgets the entry once unused.
pub struct PairGuard<'a> {
    owner: &'a PairLocks,
    key: (AccountId, AccountId),
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PairGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.owner
            .locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
