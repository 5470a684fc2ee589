//! # Email Notifier
//!
//! Renders match and new-message emails with askama and hands them to a
//! [`Mailer`].

use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;
use domains::{MatchNotice, MessageType, NewMessageNotice, Notifier};
use tracing::debug;

use crate::mailer::{Email, Mailer};

#[derive(Template)]
#[template(path = "match.html")]
struct MatchEmail<'a> {
    recipient_name: &'a str,
    counterpart_name: Option<&'a str>,
    kind: &'a str,
    app_url: &'a str,
}

#[derive(Template)]
#[template(path = "new_message.html")]
struct NewMessageEmail<'a> {
    title: &'a str,
    content: &'a str,
    app_url: &'a str,
}

/// Phrase used in match emails, e.g. "sent you a confession".
pub fn kind_phrase(message_type: MessageType) -> &'static str {
    match message_type {
        MessageType::Share => "a message",
        MessageType::Confess => "a confession",
        MessageType::Reconnect => "a reconnection request",
    }
}

pub struct EmailNotifier {
    mailer: Arc<dyn Mailer>,
    from: String,
    app_url: String,
}

impl EmailNotifier {
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>, app_url: impl Into<String>) -> Self {
        Self { mailer, from: from.into(), app_url: app_url.into() }
    }

    fn email(&self, to: &str, subject: String, html: String) -> Email {
        Email {
            from: self.from.clone(),
            to: vec![to.to_string()],
            subject,
            html,
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn match_detected(&self, notice: MatchNotice) -> anyhow::Result<()> {
        let html = MatchEmail {
            recipient_name: notice.recipient.display_name(),
            counterpart_name: notice.counterpart_name.as_deref(),
            kind: kind_phrase(notice.message_type),
            app_url: &self.app_url,
        }
        .render()?;

        debug!(recipient = %notice.recipient.id, "sending match email");
        self.mailer
            .send(self.email(&notice.recipient.email, "[HeartConnect] It's a match!".into(), html))
            .await
    }

    async fn new_message(&self, notice: NewMessageNotice) -> anyhow::Result<()> {
        let html = NewMessageEmail {
            title: &notice.title,
            content: &notice.content,
            app_url: &self.app_url,
        }
        .render()?;

        self.mailer
            .send(self.email(&notice.to, format!("[HeartConnect] {}", notice.title), html))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{Account, AccountMetadata};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Outbox(Mutex<Vec<Email>>);

    #[async_trait]
    impl Mailer for Outbox {
        async fn send(&self, email: Email) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(email);
            Ok(())
        }
    }

    fn alice() -> Account {
        Account {
            id: "1".into(),
            email: "alice@example.com".into(),
            metadata: AccountMetadata { fullname: Some("Alice Le".into()), ..Default::default() },
        }
    }

    fn notifier(outbox: Arc<Outbox>) -> EmailNotifier {
        EmailNotifier::new(outbox, "HeartConnect <noreply@heartconnect.test>", "https://heartconnect.test")
    }

    #[tokio::test]
    async fn match_email_names_a_visible_counterpart() {
        let outbox = Arc::new(Outbox::default());
        notifier(outbox.clone())
            .match_detected(MatchNotice {
                recipient: alice(),
                counterpart_name: Some("Bob Tran".into()),
                message_type: MessageType::Confess,
            })
            .await
            .unwrap();

        let sent = outbox.0.lock().unwrap();
        assert_eq!(sent[0].to, vec!["alice@example.com".to_string()]);
        assert!(sent[0].html.contains("Alice Le"));
        assert!(sent[0].html.contains("Bob Tran"));
        assert!(sent[0].html.contains("a confession"));
    }

    #[tokio::test]
    async fn match_email_hides_an_anonymous_counterpart() {
        let outbox = Arc::new(Outbox::default());
        notifier(outbox.clone())
            .match_detected(MatchNotice {
                recipient: alice(),
                counterpart_name: None,
                message_type: MessageType::Share,
            })
            .await
            .unwrap();

        let html = &outbox.0.lock().unwrap()[0].html;
        assert!(html.contains("Someone"));
    }

    #[tokio::test]
    async fn match_email_omits_the_link_without_an_app_url() {
        let outbox = Arc::new(Outbox::default());
        EmailNotifier::new(outbox.clone(), "HeartConnect <noreply@heartconnect.test>", "")
            .match_detected(MatchNotice {
                recipient: alice(),
                counterpart_name: None,
                message_type: MessageType::Reconnect,
            })
            .await
            .unwrap();

        let html = &outbox.0.lock().unwrap()[0].html;
        assert!(!html.contains("href"));
        assert!(!html.contains("Open HeartConnect"));
        assert!(html.contains("It's a match!"));
    }

    #[tokio::test]
    async fn new_message_email_escapes_content() {
        let outbox = Arc::new(Outbox::default());
        notifier(outbox.clone())
            .new_message(NewMessageNotice {
                to: "bob@example.com".into(),
                title: "Hi".into(),
                content: "<script>x</script>".into(),
                message_type: MessageType::Share,
            })
            .await
            .unwrap();

        let sent = outbox.0.lock().unwrap();
        assert_eq!(sent[0].subject, "[HeartConnect] Hi");
        assert!(!sent[0].html.contains("<script>"));
        assert!(sent[0].html.contains("&#60;script&#62;"));
    }
}
