//! # Test fixtures
//!
//! An in-process HeartConnect: in-memory store, a static directory with
//! three accounts, and a notifier that records instead of sending.

use std::sync::{Arc, Mutex};

use api_adapters::{router, AppState, RouterOptions};
use async_trait::async_trait;
use auth_adapters::StaticDirectory;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use domains::{Account, AccountMetadata, MatchNotice, NewMessageNotice, Notifier};
use serde_json::{json, Value};
use services::{DirectoryScan, FeedbackService, MessageService};
use storage_adapters::MemoryStore;
use tower::ServiceExt;

pub const ALICE: &str = "1";
pub const BOB: &str = "2";
pub const CAROL: &str = "3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Match(MatchNotice),
    NewMessage(NewMessageNotice),
}

/// Records every notification in call order.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingNotifier {
    pub fn take(&self) -> Vec<Sent> {
        self.sent.lock().map(|mut v| std::mem::take(&mut *v)).unwrap_or_default()
    }

    fn push(&self, sent: Sent) -> anyhow::Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("notifier poisoned"))?
            .push(sent);
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn match_detected(&self, notice: MatchNotice) -> anyhow::Result<()> {
        self.push(Sent::Match(notice))
    }

    async fn new_message(&self, notice: NewMessageNotice) -> anyhow::Result<()> {
        self.push(Sent::NewMessage(notice))
    }
}

pub fn accounts() -> Vec<(Account, &'static str)> {
    vec![
        (
            Account {
                id: ALICE.into(),
                email: "alice@example.com".into(),
                metadata: AccountMetadata {
                    fullname: Some("Alice Le".into()),
                    username: Some("alice".into()),
                    phone: Some("0901000001".into()),
                    profile_link: Some("https://facebook.com/alice.le".into()),
                },
            },
            "t-alice",
        ),
        (
            Account {
                id: BOB.into(),
                email: "bob@example.com".into(),
                metadata: AccountMetadata {
                    fullname: Some("Bob Tran".into()),
                    username: Some("Bob".into()),
                    phone: Some("0901000002".into()),
                    profile_link: Some("https://facebook.com/bob.tran".into()),
                },
            },
            "t-bob",
        ),
        (
            Account {
                id: CAROL.into(),
                email: "carol@example.com".into(),
                metadata: AccountMetadata {
                    username: Some("carol".into()),
                    ..AccountMetadata::default()
                },
            },
            "t-carol",
        ),
    ]
}

pub fn token_of(id: &str) -> &'static str {
    match id {
        ALICE => "t-alice",
        BOB => "t-bob",
        _ => "t-carol",
    }
}

pub struct TestApp {
    pub router: Router,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(
            accounts()
                .into_iter()
                .fold(StaticDirectory::new(), |dir, (account, token)| dir.with_account(account, token)),
        );
        let notifier = Arc::new(RecordingNotifier::default());

        // Tiny pages so resolution exercises the paged scan.
        let scan = DirectoryScan { page_size: 1, max_pages: 10 };
        let messages = MessageService::new(store.clone(), directory.clone(), notifier.clone(), scan);
        let state = AppState::new(messages, FeedbackService::new(store.clone()), directory);

        Self {
            router: router(state, &RouterOptions::default()),
            notifier,
            store,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .expect("request");

        let res = self.router.clone().oneshot(req).await.expect("router is infallible");
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// Sends as `from`; returns the response body after asserting 201.
    pub async fn send(&self, from: &str, body: Value) -> Value {
        let (status, value) = self
            .request(Method::POST, "/api/messages/send", Some(token_of(from)), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "send failed: {value}");
        value
    }

    pub async fn inbox(&self, of: &str) -> Vec<Value> {
        let (status, value) = self
            .request(Method::GET, "/api/messages/inbox", Some(token_of(of)), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["count"].as_u64(), value["messages"].as_array().map(|m| m.len() as u64));
        value["messages"].as_array().cloned().unwrap_or_default()
    }

    pub async fn sent(&self, of: &str) -> Vec<Value> {
        let (_, value) = self
            .request(Method::GET, "/api/messages/sent", Some(token_of(of)), None)
            .await;
        value["messages"].as_array().cloned().unwrap_or_default()
    }

    pub async fn delete(&self, as_user: &str, id: &str) -> StatusCode {
        self.request(Method::DELETE, &format!("/api/messages/{id}"), Some(token_of(as_user)), None)
            .await
            .0
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// A send payload addressed by `method`.
pub fn message(method: &str, to: &str, message_type: &str) -> Value {
    json!({
        "receiverIdentifier": to,
        "receiverMethod": method,
        "messageType": message_type,
        "title": "Hi",
        "content": "Thinking of you",
    })
}
