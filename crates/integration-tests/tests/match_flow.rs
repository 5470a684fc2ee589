use axum::http::{Method, StatusCode};
use integration_tests::{message, TestApp, ALICE, BOB, CAROL};
use serde_json::json;

#[tokio::test]
async fn alice_and_bob_confess_to_each_other() {
    let app = TestApp::new();

    let first = app.send(ALICE, message("username", "bob", "confess")).await;
    assert_eq!(first["success"], true);
    assert_eq!(first["isMatch"], false);
    assert_eq!(first["data"]["receiverFound"], true);

    let second = app.send(BOB, message("username", "alice", "confess")).await;
    assert_eq!(second["success"], true);
    assert_eq!(second["isMatch"], true);

    assert_eq!(app.inbox(ALICE).await.len(), 1);
    assert_eq!(app.inbox(BOB).await.len(), 1);
}

#[tokio::test]
async fn every_method_resolves_its_own_attribute() {
    let app = TestApp::new();
    for (method, identifier) in [
        ("username", "BOB"),
        ("username", "bob"),
        ("email", "Bob@Example.com"),
        ("phone", "0901000002"),
        ("profileLink", "facebook.com/bob.tran"),
        ("facebook", "bob.tran"),
    ] {
        let res = app.send(ALICE, message(method, identifier, "share")).await;
        assert_eq!(res["data"]["receiverFound"], true, "{method} {identifier}");
        assert_eq!(res["data"]["receiver"], identifier, "identifier is stored verbatim");
    }

    let miss = app.send(ALICE, message("username", "dave", "share")).await;
    assert_eq!(miss["data"]["receiverFound"], false);
}

#[tokio::test]
async fn different_type_is_not_a_match() {
    let app = TestApp::new();
    app.send(ALICE, message("username", "bob", "confess")).await;
    let res = app.send(BOB, message("username", "alice", "reconnect")).await;
    assert_eq!(res["isMatch"], false);
    assert!(app.inbox(ALICE).await.is_empty());
    assert!(app.inbox(BOB).await.is_empty());
}

#[tokio::test]
async fn unregistered_recipient_never_matches() {
    let app = TestApp::new();
    app.send(BOB, message("username", "alice", "share")).await;

    let res = app.send(ALICE, message("email", "bob@elsewhere.test", "share")).await;
    assert_eq!(res["data"]["receiverFound"], false);
    assert_eq!(res["isMatch"], false);
    assert!(app.inbox(ALICE).await.is_empty());
}

#[tokio::test]
async fn messages_to_self_never_match() {
    let app = TestApp::new();
    let first = app.send(CAROL, message("username", "carol", "share")).await;
    let second = app.send(CAROL, message("username", "carol", "share")).await;
    assert_eq!(first["isMatch"], false);
    assert_eq!(second["isMatch"], false);
    assert!(app.inbox(CAROL).await.is_empty());
    assert_eq!(app.sent(CAROL).await.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_sends_report_exactly_one_match() {
    for _ in 0..20 {
        let app = TestApp::new();
        let (a, b) = tokio::join!(
            app.send(ALICE, message("username", "bob", "reconnect")),
            app.send(BOB, message("username", "alice", "reconnect")),
        );
        let matches = [&a, &b].iter().filter(|r| r["isMatch"] == true).count();
        assert_eq!(matches, 1);
        assert_eq!(app.inbox(ALICE).await.len(), 1);
        assert_eq!(app.inbox(BOB).await.len(), 1);
    }
}

#[tokio::test]
async fn invalid_sends_are_rejected_before_storage() {
    let app = TestApp::new();
    let cases = [
        json!({ "receiverIdentifier": "bob", "receiverMethod": "username", "messageType": "share", "title": "", "content": "x" }),
        json!({ "receiverIdentifier": "not-an-email", "receiverMethod": "email", "messageType": "share", "title": "t", "content": "x" }),
        json!({ "receiverIdentifier": "call me", "receiverMethod": "phone", "messageType": "share", "title": "t", "content": "x" }),
        json!({ "receiverIdentifier": "bob", "receiverMethod": "pigeon", "messageType": "share", "title": "t", "content": "x" }),
        json!({ "receiverIdentifier": "bob", "receiverMethod": "username", "messageType": "share", "title": "t".repeat(201), "content": "x" }),
    ];
    for body in cases {
        let (status, res) = app
            .request(Method::POST, "/api/messages/send", Some("t-alice"), Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(res["success"], false);
    }
    assert!(app.sent(ALICE).await.is_empty());
}
