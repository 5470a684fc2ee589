use axum::http::{Method, StatusCode};
use chrono::{DateTime, Utc};
use integration_tests::{message, TestApp, ALICE, BOB, CAROL};
use serde_json::Value;

fn id_of(response: &Value) -> String {
    response["data"]["id"].as_str().expect("message id").to_string()
}

#[tokio::test]
async fn inbox_shows_matched_messages_only() {
    let app = TestApp::new();
    app.send(ALICE, message("username", "bob", "share")).await;
    assert!(app.inbox(BOB).await.is_empty(), "unanswered message stays hidden");

    app.send(BOB, message("username", "alice", "share")).await;

    let bob_inbox = app.inbox(BOB).await;
    assert_eq!(bob_inbox.len(), 1);
    assert_eq!(bob_inbox[0]["sender"]["displayName"], "Alice Le");
    assert_eq!(bob_inbox[0]["sender"]["username"], "alice");
    assert_eq!(bob_inbox[0]["messageType"], "share");
    assert_eq!(bob_inbox[0]["read"], false);

    let alice_inbox = app.inbox(ALICE).await;
    assert_eq!(alice_inbox.len(), 1);
    assert_eq!(alice_inbox[0]["sender"]["displayName"], "Bob Tran");
}

#[tokio::test]
async fn anonymous_senders_stay_anonymous() {
    let app = TestApp::new();
    let mut secret = message("username", "bob", "confess");
    secret["isAnonymous"] = Value::Bool(true);
    app.send(ALICE, secret).await;
    app.send(BOB, message("username", "alice", "confess")).await;

    let inbox = app.inbox(BOB).await;
    assert_eq!(inbox.len(), 1);
    let entry = &inbox[0];
    assert_eq!(entry["isAnonymous"], true);
    assert!(entry["sender"]["id"].is_null());
    assert!(entry["sender"]["username"].is_null());
    assert!(entry["sender"]["profileLink"].is_null());

    let serialized = entry.to_string();
    for leak in ["Alice Le", "alice", "facebook.com/alice.le", "\"1\""] {
        assert!(!serialized.contains(leak), "inbox entry leaks {leak}: {serialized}");
    }
}

#[tokio::test]
async fn deleting_one_half_revokes_the_match() {
    let app = TestApp::new();
    let from_alice = app.send(ALICE, message("username", "bob", "reconnect")).await;
    let from_bob = app.send(BOB, message("username", "alice", "reconnect")).await;
    assert_eq!(app.inbox(BOB).await.len(), 1);

    assert_eq!(app.delete(ALICE, &id_of(&from_alice)).await, StatusCode::OK);

    assert!(app.inbox(BOB).await.is_empty());
    assert!(app.inbox(ALICE).await.is_empty());

    // Only Alice's row went away; Bob's message is still stored.
    let bob_sent = app.sent(BOB).await;
    assert_eq!(bob_sent.len(), 1);
    assert_eq!(bob_sent[0]["id"].as_str(), Some(id_of(&from_bob).as_str()));

    // Re-sending restores the match.
    let again = app.send(ALICE, message("username", "bob", "reconnect")).await;
    assert_eq!(again["isMatch"], true);
    assert_eq!(app.inbox(ALICE).await.len(), 1);
}

#[tokio::test]
async fn delete_is_limited_to_the_two_parties() {
    let app = TestApp::new();
    let sent = app.send(ALICE, message("username", "bob", "share")).await;
    let id = id_of(&sent);

    assert_eq!(app.delete(CAROL, &id).await, StatusCode::FORBIDDEN);
    assert_eq!(app.delete(BOB, &id).await, StatusCode::OK);
    assert_eq!(app.delete(ALICE, &id).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn repeated_reads_are_identical() {
    let app = TestApp::new();
    app.send(ALICE, message("username", "bob", "share")).await;
    app.send(CAROL, message("username", "bob", "share")).await;
    app.send(BOB, message("username", "alice", "share")).await;
    app.send(BOB, message("username", "carol", "share")).await;

    let first = app.inbox(BOB).await;
    let second = app.inbox(BOB).await;
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    // Newest first.
    assert_eq!(first[0]["sender"]["username"], "carol");
}

#[tokio::test]
async fn only_the_receiver_marks_read() {
    let app = TestApp::new();
    let sent = app.send(ALICE, message("username", "bob", "share")).await;
    app.send(BOB, message("username", "alice", "share")).await;
    let uri = format!("/api/messages/{}/read", id_of(&sent));

    let (status, _) = app.request(Method::POST, &uri, Some("t-alice"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.request(Method::POST, &uri, Some("t-bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.inbox(BOB).await[0]["read"], true);
}

#[tokio::test]
async fn sent_view_is_newest_first_and_capped() {
    let app = TestApp::new();
    for _ in 0..55 {
        app.send(CAROL, message("username", "nobody", "share")).await;
    }
    let sent = app.sent(CAROL).await;
    assert_eq!(sent.len(), services::SENT_VIEW_LIMIT);
    assert_eq!(sent[0]["receiverFound"], false);
    let stamps: Vec<DateTime<Utc>> = sent
        .iter()
        .filter_map(|m| m["createdAt"].as_str())
        .map(|s| s.parse().expect("rfc3339 timestamp"))
        .collect();
    assert_eq!(stamps.len(), sent.len());
    assert!(stamps.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn every_message_route_requires_a_token() {
    let app = TestApp::new();
    for (method, uri) in [
        (Method::GET, "/api/messages/inbox"),
        (Method::GET, "/api/messages/sent"),
        (Method::DELETE, "/api/messages/0192f5e0-0000-7000-8000-000000000000"),
        (Method::POST, "/api/messages/0192f5e0-0000-7000-8000-000000000000/read"),
    ] {
        let (status, body) = app.request(method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["success"], false);
    }
}
